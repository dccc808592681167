//! Symptom catalogue (30 entries, ids are array positions).

use crate::domain::{SeverityScale, Symptom, NUM_SYMPTOMS};

const fn symptom(
    id: usize,
    name: &'static str,
    medical_term: &'static str,
    icd_10: &'static str,
    description: &'static str,
    scale: SeverityScale,
) -> Symptom {
    Symptom {
        id,
        name,
        medical_term,
        icd_10,
        description,
        scale,
    }
}

use SeverityScale::{AreaCoverage, Bpm, Decibels, Frequency, Percentage, Temperature, ZeroToTen};

pub static SYMPTOMS: [Symptom; NUM_SYMPTOMS] = [
    symptom(0, "Fever", "Pyrexia", "R50.9", "Elevated body temperature above normal range (>100.4°F/38°C)", Temperature),
    symptom(1, "Fatigue", "Asthenia", "R53.83", "Persistent tiredness not relieved by rest", ZeroToTen),
    symptom(2, "Weight Loss", "Cachexia", "R63.4", "Unintentional decrease in body weight", Percentage),
    symptom(3, "Cough", "Tussis", "R05", "Sudden expulsion of air from lungs", ZeroToTen),
    symptom(4, "Shortness of Breath", "Dyspnea", "R06.02", "Difficulty breathing or feeling of breathlessness", ZeroToTen),
    symptom(5, "Wheezing", "Sibilant Rhonchi", "R06.2", "High-pitched whistling sound when breathing", ZeroToTen),
    symptom(6, "Sore Throat", "Pharyngitis", "J02.9", "Pain or irritation in the throat", ZeroToTen),
    symptom(7, "Runny Nose", "Rhinorrhea", "J34.89", "Excess nasal drainage", ZeroToTen),
    symptom(8, "Nasal Congestion", "Nasal Obstruction", "J34.89", "Blockage of nasal passages", ZeroToTen),
    symptom(9, "Nausea", "Nausea", "R11.0", "Feeling of sickness with inclination to vomit", ZeroToTen),
    symptom(10, "Vomiting", "Emesis", "R11.10", "Forceful expulsion of stomach contents", Frequency),
    symptom(11, "Diarrhea", "Diarrhea", "K59.1", "Loose, watery stools occurring more than three times in one day", Frequency),
    symptom(12, "Headache", "Cephalgia", "R51", "Pain in any region of the head", ZeroToTen),
    symptom(13, "Dizziness", "Vertigo", "R42", "Sensation of spinning or loss of balance", ZeroToTen),
    symptom(14, "Confusion", "Disorientation", "R41.0", "Inability to think clearly or coherently", ZeroToTen),
    symptom(15, "Joint Pain", "Arthralgia", "M25.50", "Pain in one or more joints", ZeroToTen),
    symptom(16, "Muscle Pain", "Myalgia", "M79.1", "Pain in muscle or group of muscles", ZeroToTen),
    symptom(17, "Back Pain", "Dorsalgia", "M54.9", "Pain in the back region", ZeroToTen),
    symptom(18, "Chest Pain", "Thoracalgia", "R07.9", "Pain or discomfort in the chest area", ZeroToTen),
    symptom(19, "Rapid Heartbeat", "Tachycardia", "R00.0", "Heart rate over 100 beats per minute", Bpm),
    symptom(20, "Irregular Heartbeat", "Arrhythmia", "I49.9", "Abnormal heart rhythm", Frequency),
    symptom(21, "Rash", "Exanthem", "R21", "Change in skin color or texture", AreaCoverage),
    symptom(22, "Itching", "Pruritus", "L29.9", "Uncomfortable sensation causing desire to scratch", ZeroToTen),
    symptom(23, "Swelling", "Edema", "R60.9", "Abnormal accumulation of fluid in tissues", ZeroToTen),
    symptom(24, "Anxiety", "Anxiety Disorder", "F41.9", "Excessive worry or fear", ZeroToTen),
    symptom(25, "Depression", "Major Depressive Disorder", "F32.9", "Persistent sadness and loss of interest", ZeroToTen),
    symptom(26, "Frequent Urination", "Polyuria", "R35.0", "Abnormally large volume of urination", Frequency),
    symptom(27, "Painful Urination", "Dysuria", "R30.0", "Pain or burning sensation during urination", ZeroToTen),
    symptom(28, "Blurred Vision", "Visual Disturbance", "H53.8", "Lack of sharpness in vision", ZeroToTen),
    symptom(29, "Hearing Loss", "Hypoacusis", "H91.90", "Partial or total inability to hear", Decibels),
];

/// Well-known symptom ids used by the clinical rules.
pub mod ids {
    pub const FEVER: usize = 0;
    pub const FATIGUE: usize = 1;
    pub const COUGH: usize = 3;
    pub const DYSPNEA: usize = 4;
    pub const WHEEZING: usize = 5;
    pub const SORE_THROAT: usize = 6;
    pub const RHINORRHEA: usize = 7;
    pub const CONGESTION: usize = 8;
    pub const NAUSEA: usize = 9;
    pub const VOMITING: usize = 10;
    pub const DIARRHEA: usize = 11;
    pub const DIZZINESS: usize = 13;
    pub const CONFUSION: usize = 14;
    pub const MYALGIA: usize = 16;
    pub const CHEST_PAIN: usize = 18;
    pub const URINARY_FREQUENCY: usize = 26;
    pub const DYSURIA: usize = 27;
    /// Sensory slot the respiratory disease patterns use for anosmia.
    pub const ANOSMIA: usize = 28;
}
