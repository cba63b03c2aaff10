//! Canonical column names, as produced by `normalize_header` on DVF extracts.

pub const ID_MUTATION: &str = "id_mutation";
pub const NUMERO_DISPOSITION: &str = "numero_disposition";
pub const DATE_MUTATION: &str = "date_mutation";
pub const ANNEE: &str = "annee";
pub const TRIMESTRE: &str = "trimestre";
pub const NATURE_MUTATION: &str = "nature_mutation";
pub const VALEUR_FONCIERE: &str = "valeur_fonciere";
pub const TYPE_LOCAL: &str = "type_local";
pub const NOMBRE_PIECES: &str = "nombre_pieces_principales";
pub const SURFACE_BATI: &str = "surface_reelle_bati";
pub const SURFACE_TERRAIN: &str = "surface_terrain";
pub const CODE_DEPARTEMENT: &str = "code_departement";
pub const CODE_POSTAL: &str = "code_postal";
pub const NOM_COMMUNE: &str = "nom_commune";
pub const ADRESSE_NOM_VOIE: &str = "adresse_nom_voie";
pub const LONGITUDE: &str = "longitude";
pub const LATITUDE: &str = "latitude";

pub const PRIX_M2: &str = "prix_m2";
pub const ARRONDISSEMENT: &str = "arrondissement";
pub const CLASSE_PIECES: &str = "classe_pieces";
pub const CLASSE_SURFACE: &str = "classe_surface_m2";

/// Coerced to Float64 at ingestion time.
pub const INGEST_NUMERIC: [&str; 4] = [VALEUR_FONCIERE, SURFACE_BATI, NOMBRE_PIECES, SURFACE_TERRAIN];

/// Re-coerced by the first cleaning stage.
pub const CLEAN_NUMERIC: [&str; 3] = [VALEUR_FONCIERE, SURFACE_BATI, NOMBRE_PIECES];

/// Leading columns of the raw table; everything else follows in load order.
pub const PREFERRED_RAW_ORDER: [&str; 12] = [
    ANNEE,
    DATE_MUTATION,
    NATURE_MUTATION,
    VALEUR_FONCIERE,
    TYPE_LOCAL,
    NOMBRE_PIECES,
    SURFACE_BATI,
    ADRESSE_NOM_VOIE,
    CODE_POSTAL,
    NOM_COMMUNE,
    LONGITUDE,
    LATITUDE,
];

/// The clean table's schema, in order. Columns missing upstream are skipped.
pub const FINAL_CLEAN_COLUMNS: [&str; 18] = [
    ID_MUTATION,
    DATE_MUTATION,
    ANNEE,
    TRIMESTRE,
    NATURE_MUTATION,
    TYPE_LOCAL,
    VALEUR_FONCIERE,
    SURFACE_BATI,
    PRIX_M2,
    NOMBRE_PIECES,
    CLASSE_PIECES,
    CLASSE_SURFACE,
    CODE_POSTAL,
    ARRONDISSEMENT,
    NOM_COMMUNE,
    ADRESSE_NOM_VOIE,
    LONGITUDE,
    LATITUDE,
];
