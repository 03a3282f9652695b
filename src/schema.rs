/// Column-name constants for the feed-conversion tables.
/// Single source of truth for every frame read or written by the crate.

// ── Breeding initial parameters ─────────────────────────────────────────────
pub mod init_param {
    pub const TABLE: &str = "breeding_init_params";

    pub const ENTITY_ID: &str = "entity_id";
    pub const PARENT_ENTITY_ID: &str = "parent_entity_id";
    pub const BREEDING_CODE: &str = "breeding_code";
    pub const GENETIC_LINE: &str = "genetic_line";
    pub const SEX: &str = "sex";
    pub const ID_BREEDING: &str = "id_breeding";
    pub const ID_STAGE: &str = "id_stage";
}

// ── Weight / consumption measurements ───────────────────────────────────────
pub mod weight_consumption {
    pub const TABLE: &str = "weight_consumptions";

    pub const MEASURED_WEIGHT: &str = "measured_weight";
    pub const ANIMALS_AGE: &str = "animals_age";
    pub const DATE: &str = "date";
    pub const ENTITY_ACCUMULATED_CONSUMPTION: &str = "entity_accumulated_consumption";
    pub const ANIMAL_ACCUMULATED_CONSUMPTION: &str = "animal_accumulated_consumption";
    pub const STOCK: &str = "stock";
    pub const INITIAL_WEIGHT_AVG: &str = "initial_weight_avg";
    pub const INITIAL_AGE: &str = "initial_age";
    pub const INITIAL_TOTAL_QUANTITY: &str = "initial_total_quantity";
    pub const ID_BREEDING: &str = "id_breeding";
}

// ── Standard reference (canonical names) ────────────────────────────────────
pub mod standard {
    pub const TABLE: &str = "standard_reference";

    pub const ANIMALS_AGE: &str = "animals_age";
    pub const SEX: &str = "sex";
    pub const ID_STAGE: &str = "id_stage";
    pub const ANIMAL_ACCUMULATED_STANDARD_CONVERSION: &str =
        "animal_accumulated_standard_conversion";
    pub const ANIMAL_DAILY_STANDARD_CONVERSION: &str = "animal_daily_standard_conversion";
}

// ── Genetic catalogue files (source names) ──────────────────────────────────
pub mod catalogue {
    pub const AGE: &str = "edad";
    pub const SEX: &str = "sexo";
    pub const GENETIC_LINE: &str = "nombreGenetica";
    pub const ACCUMULATED: &str = "conversion";
    pub const DAILY: &str = "conversionAcumulada";

    pub const DEFAULT_GENETIC_LINE: &str = "ROSS - 2020";
}

// ── Conversion output ───────────────────────────────────────────────────────
pub mod conversion {
    pub const ID_BREEDING: &str = "id_breeding";
    pub const ANIMALS_AGE: &str = "animals_age";
    pub const DATE: &str = "date";
    pub const ANIMAL_ACCUMULATED_CONVERSION: &str = "animal_accumulated_conversion";
    pub const ACCUMULATED_STANDARD_CONVERSION: &str = "accumulated_standard_conversion";
    pub const ENTITY_ACCUMULATED_CONVERSION: &str = "entity_accumulated_conversion";
    pub const CALCULATION_FORMULA_VERSION: &str = "calculation_formula_version";
}
