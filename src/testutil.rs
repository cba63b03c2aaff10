use anyhow::Result;
use std::{fs, path::Path};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_test_logging() {
    let subscriber = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

const HEADER: [&str; 16] = [
    "id_mutation",
    "date_mutation",
    "numero_disposition",
    "nature_mutation",
    "valeur_fonciere",
    "adresse_nom_voie",
    "code_postal",
    "code_commune",
    "nom_commune",
    "code_departement",
    "type_local",
    "surface_reelle_bati",
    "nombre_pieces_principales",
    "surface_terrain",
    "longitude",
    "latitude",
];

/// Two small DVF extracts, `75_2020.csv` (`;`, French decimals) and
/// `75_2021.csv` (`,`). Four rows survive cleaning, all at 10 000 €/m².
pub fn write_sample_sources(dir: &Path) -> Result<()> {
    let rows_2020 = [
        "2020-1;2020-02-14;000001;Vente;500000,00;RUE OBERKAMPF;75011;75111;Paris 11e Arrondissement;75;Appartement;50;2;;2,37;48,86",
        // later copy of the same disposition
        "2020-1;2020-03-01;000001;Vente;500000,00;RUE OBERKAMPF;75011;75111;Paris 11e Arrondissement;75;Appartement;50;2;;2,37;48,86",
        "2020-2;2020-07-03;000001;Vente;700000;RUE DE VAUGIRARD;75015;75115;Paris 15e Arrondissement;75;Maison;70;3;120;2,29;48,84",
        "2020-3;2020-09-10;000001;Echange;300000;RUE DU BAC;75007;75107;Paris 7e Arrondissement;75;Appartement;30;1;;2,32;48,85",
        "2020-4;2020-10-02;000001;Vente;15000;RUE DU BAC;75007;75107;Paris 7e Arrondissement;75;Dépendance;;;;2,32;48,85",
        "2020-5;2020-11-20;000001;Vente;400000;RUE DE PARIS;92100;92012;Boulogne-Billancourt;92;Appartement;40;2;;2,24;48,83",
    ];
    let rows_2021 = [
        // listed first but later than the row it repeats
        "2021-1,2021-07-01,000001,Vente,300000,RUE MOUFFETARD,75005,75105,Paris 5e Arrondissement,75,Appartement,30,2,,2.35,48.84",
        "2021-1,2021-05-20,000001,Vente,250000,RUE MOUFFETARD,75005,75105,Paris 5e Arrondissement,75,Appartement,25,1,,2.35,48.84",
        "2021-2,2021-11-08,000001,Vente,700000,AV MOZART,75016,75116,Paris 16e Arrondissement,75,Maison,70,3,200,2.27,48.85",
        "2021-3,2021-01-15,000001,Vente,350000,RUE DE RIVOLI,75001,75101,Paris 1er Arrondissement,75,Appartement,,2,,2.34,48.86",
        "2021-4,2021-02-01,000001,Vente,80000,RUE DE RIVOLI,75001,75101,Paris 1er Arrondissement,75,Appartement,8,1,,2.34,48.86",
        "2021-5,2021-03-12,000001,Vente,450000,RUE LECOURBE,,75115,Paris 15e Arrondissement,75,Appartement,45,2,,2.30,48.84",
        "2021-6,2021-06-30,000001,Vente,1000000,RUE DE GRENELLE,75007,75107,Paris 7e Arrondissement,75,Appartement,50,2,,2.32,48.85",
        "2021-7,2021-09-14,000001,Vente,20000,AV MOZART,75016,75116,Paris 16e Arrondissement,75,Dépendance,,,,2.27,48.85",
    ];

    fs::write(
        dir.join("75_2020.csv"),
        format!("{}\n{}\n", HEADER.join(";"), rows_2020.join("\n")),
    )?;
    fs::write(
        dir.join("75_2021.csv"),
        format!("{}\n{}\n", HEADER.join(","), rows_2021.join("\n")),
    )?;
    Ok(())
}
