//! Disease catalogue: syndrome-level diagnoses plus the confirmed
//! diagnoses they upgrade to once a test comes back positive.

use crate::domain::{CertaintyTier, Disease, SymptomPattern};

use CertaintyTier::{Clinical, Confirmatory, Presumptive};

const fn p(frequency: f64, lo: f64, hi: f64) -> SymptomPattern {
    SymptomPattern::new(frequency, lo, hi)
}

/// Disease names referenced by rules and mappings.
pub mod names {
    pub const VIRAL_URI: &str = "Viral Upper Respiratory Infection";
    pub const ILI: &str = "Influenza-like Illness";
    pub const COVID_LIKE: &str = "COVID-19-like Illness";
    pub const VIRAL_SYNDROME: &str = "Viral Syndrome";
    pub const GASTROENTERITIS: &str = "Acute Gastroenteritis";
    pub const PNEUMONIA: &str = "Pneumonia Syndrome";
    pub const INFLUENZA_CONFIRMED: &str = "Influenza (Confirmed)";
    pub const COVID_CONFIRMED: &str = "COVID-19 (Confirmed)";
    pub const STREP: &str = "Streptococcal Pharyngitis";
    pub const ALLERGIC_RHINITIS: &str = "Allergic Rhinitis";
    pub const UTI: &str = "Urinary Tract Infection";
}

// Shared by the suspected and confirmed COVID-19 entries.
const COVID_PATTERNS: [(usize, SymptomPattern); 9] = [
    (0, p(0.75, 0.4, 0.9)),
    (3, p(0.80, 0.3, 0.8)),
    (4, p(0.40, 0.3, 0.9)),
    (1, p(0.85, 0.5, 0.9)),
    (28, p(0.60, 0.8, 1.0)),
    (12, p(0.65, 0.3, 0.7)),
    (16, p(0.50, 0.4, 0.7)),
    (6, p(0.50, 0.2, 0.5)),
    (11, p(0.30, 0.3, 0.7)),
];

pub static DISEASES: [Disease; 11] = [
    Disease {
        id: 0,
        name: names::VIRAL_URI,
        medical_name: "Viral URI",
        icd_10: "J06.9",
        certainty: Clinical,
        description: "Clinical syndrome of upper respiratory symptoms likely viral in origin",
        typical_duration: "7-10 days",
        patterns: &[
            (7, p(0.85, 0.3, 0.7)),
            (8, p(0.80, 0.3, 0.7)),
            (6, p(0.70, 0.2, 0.6)),
            (3, p(0.75, 0.2, 0.6)),
            (1, p(0.60, 0.2, 0.5)),
            (12, p(0.50, 0.2, 0.5)),
            (0, p(0.30, 0.1, 0.3)),
        ],
        required_tests: &[],
        supportive_tests: &["Respiratory viral panel (if severe)"],
        red_flags: &["Dyspnea", "Chest pain", "High fever >103°F"],
        pearls: &[
            "Most common respiratory diagnosis",
            "Cough may persist 2-3 weeks",
            "Antibiotics not indicated",
        ],
    },
    Disease {
        id: 1,
        name: names::ILI,
        medical_name: "ILI (Influenza-like Illness)",
        icd_10: "J11.1",
        certainty: Presumptive,
        description: "Clinical syndrome consistent with influenza but not laboratory confirmed",
        typical_duration: "5-7 days",
        patterns: &[
            (0, p(0.90, 0.6, 0.9)),
            (1, p(0.95, 0.7, 0.9)),
            (3, p(0.85, 0.4, 0.7)),
            (12, p(0.80, 0.5, 0.8)),
            (16, p(0.85, 0.6, 0.8)),
            (6, p(0.60, 0.3, 0.6)),
        ],
        required_tests: &["Influenza A/B antigen or PCR for confirmation"],
        supportive_tests: &["CBC", "CRP if pneumonia suspected"],
        red_flags: &["Dyspnea", "Persistent fever", "Altered mental status"],
        pearls: &[
            "Abrupt onset is characteristic",
            "Myalgia more prominent than with common cold",
            "Consider antiviral if <48 hours of symptoms",
        ],
    },
    Disease {
        id: 2,
        name: names::COVID_LIKE,
        medical_name: "Suspected COVID-19",
        icd_10: "U07.2",
        certainty: Presumptive,
        description: "Clinical syndrome consistent with COVID-19 pending confirmation",
        typical_duration: "7-14 days (acute phase)",
        patterns: &COVID_PATTERNS,
        required_tests: &["SARS-CoV-2 PCR or antigen test"],
        supportive_tests: &["Chest X-ray", "D-dimer", "CRP", "Ferritin if severe"],
        red_flags: &["SpO2 <94%", "Respiratory rate >24", "Confusion"],
        pearls: &[
            "Loss of taste/smell highly specific",
            "GI symptoms more common than flu",
            "Silent hypoxia possible",
            "Consider monoclonal antibodies if high risk",
        ],
    },
    Disease {
        id: 3,
        name: names::VIRAL_SYNDROME,
        medical_name: "Viral Syndrome, Unspecified",
        icd_10: "B34.9",
        certainty: Clinical,
        description: "Nonspecific viral illness with systemic symptoms",
        typical_duration: "3-7 days",
        patterns: &[
            (1, p(0.90, 0.4, 0.7)),
            (0, p(0.60, 0.2, 0.5)),
            (12, p(0.70, 0.3, 0.6)),
            (16, p(0.60, 0.3, 0.6)),
            (9, p(0.30, 0.2, 0.4)),
        ],
        required_tests: &[],
        supportive_tests: &["CBC if prolonged", "Mono spot if adolescent"],
        red_flags: &["Persistent fever >1 week", "Severe headache", "Neck stiffness"],
        pearls: &[
            "Diagnosis of exclusion",
            "Supportive care mainstay",
            "Consider EBV in young adults",
        ],
    },
    Disease {
        id: 4,
        name: names::GASTROENTERITIS,
        medical_name: "Acute Gastroenteritis, Unspecified",
        icd_10: "K52.9",
        certainty: Clinical,
        description: "Acute inflammation of GI tract, likely infectious",
        typical_duration: "1-3 days",
        patterns: &[
            (11, p(0.95, 0.5, 0.9)),
            (9, p(0.85, 0.4, 0.8)),
            (10, p(0.70, 0.3, 0.8)),
            (1, p(0.80, 0.4, 0.7)),
            (0, p(0.40, 0.1, 0.4)),
            (17, p(0.60, 0.4, 0.7)),
        ],
        required_tests: &[],
        supportive_tests: &["Stool studies if bloody/prolonged", "BMP if dehydrated"],
        red_flags: &["Bloody diarrhea", "Severe dehydration", "High fever", ">10 stools/day"],
        pearls: &[
            "Viral > bacterial in most cases",
            "Focus on hydration",
            "BRAT diet outdated advice",
        ],
    },
    Disease {
        id: 5,
        name: names::PNEUMONIA,
        medical_name: "Community-Acquired Pneumonia Syndrome",
        icd_10: "J18.9",
        certainty: Presumptive,
        description: "Clinical syndrome of lung infection requiring imaging confirmation",
        typical_duration: "1-3 weeks",
        patterns: &[
            (0, p(0.85, 0.5, 0.9)),
            (3, p(0.95, 0.5, 0.9)),
            (4, p(0.75, 0.4, 0.8)),
            (18, p(0.65, 0.4, 0.8)),
            (1, p(0.90, 0.5, 0.8)),
            (5, p(0.50, 0.3, 0.7)),
        ],
        required_tests: &["Chest X-ray", "CBC", "BMP"],
        supportive_tests: &["Blood cultures if hospitalized", "Sputum culture", "Procalcitonin"],
        red_flags: &["Hypoxia", "Hypotension", "Confusion", "Respiratory rate >30"],
        pearls: &[
            "Diagnosis requires infiltrate on imaging",
            "Use CURB-65 for severity",
            "Atypical presentation in elderly",
        ],
    },
    Disease {
        id: 6,
        name: names::INFLUENZA_CONFIRMED,
        medical_name: "Influenza A or B",
        icd_10: "J09-J11",
        certainty: Confirmatory,
        description: "Laboratory-confirmed influenza infection",
        typical_duration: "5-7 days",
        patterns: &[
            (0, p(0.95, 0.7, 0.9)),
            (1, p(0.95, 0.7, 0.9)),
            (3, p(0.85, 0.4, 0.7)),
            (12, p(0.80, 0.5, 0.8)),
            (16, p(0.85, 0.6, 0.8)),
            (6, p(0.60, 0.3, 0.6)),
            (4, p(0.30, 0.3, 0.7)),
        ],
        required_tests: &["Positive influenza A/B test"],
        supportive_tests: &[],
        red_flags: &["Secondary bacterial pneumonia", "Myocarditis", "Encephalopathy"],
        pearls: &[
            "Oseltamivir within 48 hours",
            "High-risk patients benefit most from treatment",
            "Can shed virus before symptoms",
        ],
    },
    Disease {
        id: 7,
        name: names::COVID_CONFIRMED,
        medical_name: "SARS-CoV-2 Infection",
        icd_10: "U07.1",
        certainty: Confirmatory,
        description: "Laboratory-confirmed SARS-CoV-2 infection",
        typical_duration: "7-14 days (acute)",
        patterns: &COVID_PATTERNS,
        required_tests: &["Positive SARS-CoV-2 test"],
        supportive_tests: &["CXR", "D-dimer", "Inflammatory markers if severe"],
        red_flags: &["Silent hypoxia", "D-dimer elevation", "Cytokine storm markers"],
        pearls: &[
            "Monitor oxygen saturation",
            "Consider antivirals in high risk",
            "Watch for day 7-10 deterioration",
            "Long COVID possible",
        ],
    },
    Disease {
        id: 8,
        name: names::STREP,
        medical_name: "Group A Strep Pharyngitis",
        icd_10: "J02.0",
        certainty: Confirmatory,
        description: "Bacterial throat infection requiring antibiotics",
        typical_duration: "5-7 days with treatment",
        patterns: &[
            (6, p(1.0, 0.6, 0.9)),
            (0, p(0.85, 0.5, 0.8)),
            (12, p(0.60, 0.3, 0.6)),
            (23, p(0.80, 0.4, 0.7)),
            (1, p(0.50, 0.3, 0.5)),
            (3, p(0.10, 0.0, 0.2)),
        ],
        required_tests: &["Rapid strep test or throat culture"],
        supportive_tests: &[],
        red_flags: &["Drooling", "Trismus", "Unilateral swelling (abscess)"],
        pearls: &[
            "Centor criteria guide testing",
            "Absence of cough is key feature",
            "Treat to prevent rheumatic fever",
        ],
    },
    Disease {
        id: 9,
        name: names::ALLERGIC_RHINITIS,
        medical_name: "Allergic Rhinitis",
        icd_10: "J30.9",
        certainty: Clinical,
        description: "IgE-mediated nasal inflammation from allergen exposure",
        typical_duration: "Seasonal or perennial",
        patterns: &[
            (7, p(0.95, 0.4, 0.8)),
            (8, p(0.90, 0.4, 0.8)),
            (22, p(0.85, 0.4, 0.8)),
            (28, p(0.70, 0.3, 0.6)),
            (12, p(0.40, 0.2, 0.5)),
            (0, p(0.0, 0.0, 0.0)),
        ],
        required_tests: &[],
        supportive_tests: &["Allergy testing if severe", "IgE levels"],
        red_flags: &["Unilateral symptoms", "Bloody discharge", "Facial pain"],
        pearls: &[
            "No fever distinguishes from infection",
            "Allergic salute and shiners",
            "Seasonal pattern helpful",
        ],
    },
    Disease {
        id: 10,
        name: names::UTI,
        medical_name: "Uncomplicated Cystitis",
        icd_10: "N39.0",
        certainty: Presumptive,
        description: "Bacterial infection of bladder",
        typical_duration: "3-5 days with treatment",
        patterns: &[
            (27, p(0.95, 0.5, 0.9)),
            (26, p(0.90, 0.5, 0.8)),
            (17, p(0.60, 0.3, 0.6)),
            (0, p(0.20, 0.1, 0.3)),
            (9, p(0.15, 0.1, 0.3)),
        ],
        required_tests: &["Urinalysis"],
        supportive_tests: &["Urine culture if recurrent/complicated"],
        red_flags: &["Fever", "Flank pain", "Prior resistant organisms"],
        pearls: &[
            "Uncomplicated in healthy women",
            "3 days of antibiotics sufficient",
            "Pyridium for symptom relief",
        ],
    },
];
