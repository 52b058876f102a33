//! Registry schema for the bundled SQLite store.
//!
//! `patients` is the source table, `ehvol` a denormalized summary view over
//! it, and `patient_genomic_variants` holds per-patient variant calls.

/// DDL applied by [`SqliteStore::init`](super::SqliteStore::init).
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS patients (
    dna_id TEXT PRIMARY KEY,
    mrn TEXT,
    name TEXT,
    age INTEGER,
    gender TEXT,
    nationality TEXT,
    current_city TEXT,
    current_city_category TEXT,
    diabetes_mellitus INTEGER,
    high_blood_pressure INTEGER,
    echo_ef REAL,
    mri_ef REAL,
    hba1c REAL,
    troponin_i REAL,
    history_sudden_death INTEGER,
    history_premature_cad INTEGER,
    enrollment_date TEXT
);

CREATE TABLE IF NOT EXISTS patient_genomic_variants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dna_id TEXT NOT NULL REFERENCES patients(dna_id),
    gene TEXT,
    variant TEXT,
    zygosity TEXT,
    clinical_significance TEXT
);

CREATE INDEX IF NOT EXISTS idx_variants_dna_id ON patient_genomic_variants(dna_id);

CREATE VIEW IF NOT EXISTS ehvol AS
SELECT
    dna_id, age, gender, nationality, current_city, current_city_category,
    diabetes_mellitus, high_blood_pressure, echo_ef, mri_ef, hba1c, troponin_i,
    enrollment_date
FROM patients;
";

/// Small synthetic cohort for local runs and tests.
pub const SAMPLE_DATA: &str = r"
INSERT INTO patients VALUES
    ('P001', 'MRN-1001', 'Amira Haddad', 54, 'female', 'Lebanese', 'Beirut', 'urban', 1, 1, 35.0, NULL, 7.9, 0.02, 0, 1, '2023-01-10'),
    ('P002', 'MRN-1002', 'Omar Khalil', 61, 'male', 'Lebanese', 'Tripoli', 'urban', 0, 1, 55.0, 52.0, NULL, NULL, 0, 0, '2023-02-14'),
    ('P003', 'MRN-1003', 'Lina Saad', 45, 'female', 'Syrian', 'Beirut', 'urban', 1, 0, NULL, NULL, 6.8, NULL, 1, 0, '2023-03-01'),
    ('P004', 'MRN-1004', 'Karim Nassar', 38, 'male', 'Lebanese', 'Zahle', 'rural', 0, 0, NULL, NULL, NULL, NULL, 0, 0, '2023-04-22'),
    ('P005', 'MRN-1005', 'Rania Fares', 67, 'female', 'Jordanian', 'Amman', 'urban', 1, 1, 40.0, 38.0, 8.4, 0.05, 0, 1, '2023-05-05'),
    ('P006', 'MRN-1006', 'Youssef Aoun', 52, 'male', 'Lebanese', 'Beirut', 'urban', 1, 1, 60.0, NULL, 7.1, NULL, 0, 0, '2023-06-18');

INSERT INTO patient_genomic_variants (dna_id, gene, variant, zygosity, clinical_significance) VALUES
    ('P001', 'MYH7', 'c.1208G>A', 'heterozygous', 'pathogenic'),
    ('P005', 'TTN', 'c.59926+1G>A', 'heterozygous', 'likely pathogenic'),
    ('P005', 'LMNA', 'c.357-2A>G', 'heterozygous', 'uncertain significance');
";
