#![cfg(feature = "serde")]

use serde::{Deserialize, Serialize};

use libcsv::{DialectBuilder, Error, ReaderBuilder, WriterBuilder};

#[derive(Debug, Deserialize, PartialEq, Serialize)]
struct City {
    name: String,
    country: String,
    population: Option<u64>,
    capital: bool,
}

fn cities() -> Vec<City> {
    vec![
        City {
            name: "Reykjavík".to_string(),
            country: "IS".to_string(),
            population: Some(139_875),
            capital: true,
        },
        City {
            name: "Springfield, \"the\" one".to_string(),
            country: "US".to_string(),
            population: None,
            capital: false,
        },
    ]
}

#[test]
fn structs_with_header() {
    let dialect = DialectBuilder::new()
        .delimiter(';')
        .has_header(true)
        .line_terminator("\n")
        .build()
        .unwrap();
    let mut wtr =
        WriterBuilder::new().dialect(dialect.clone()).from_writer(vec![]).unwrap();
    for city in cities() {
        wtr.serialize(&city).unwrap();
    }
    let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    assert_eq!(
        data,
        "\
\"name\";\"country\";\"population\";\"capital\"
\"Reykjavík\";\"IS\";139875;true
\"Springfield, \"\"the\"\" one\";\"US\";;false
"
    );

    let mut rdr =
        ReaderBuilder::new().dialect(dialect).from_reader(data.as_bytes()).unwrap();
    let got: Vec<City> = rdr.deserialize().collect::<libcsv::Result<_>>().unwrap();
    assert_eq!(cities(), got);
}

#[test]
fn tuples_without_header() {
    let mut wtr = WriterBuilder::new()
        .dialect(libcsv::Dialect::default())
        .from_writer(vec![])
        .unwrap();
    wtr.serialize(("a", 1i8, 2.5f64)).unwrap();
    wtr.serialize(("b", -1i8, 0.5f64)).unwrap();
    let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    assert_eq!(data, "\"a\",1,2.5\r\n\"b\",-1,0.5\r\n");

    let mut rdr = libcsv::Reader::from_reader(data.as_bytes()).unwrap();
    let got: Vec<(String, i8, f64)> =
        rdr.deserialize().collect::<libcsv::Result<_>>().unwrap();
    assert_eq!(
        vec![("a".to_string(), 1, 2.5), ("b".to_string(), -1, 0.5)],
        got
    );
}

#[test]
fn deserialize_error_has_position() {
    let dialect = DialectBuilder::new().has_header(true).build().unwrap();
    let data = "name,country,population,capital\nOslo,NO,lots,true\n";
    let mut rdr =
        ReaderBuilder::new().dialect(dialect).from_reader(data.as_bytes()).unwrap();
    let res: Option<libcsv::Result<City>> = rdr.deserialize().next();
    match res {
        Some(Err(Error::Deserialize { pos: Some(pos), err })) => {
            assert_eq!(2, pos.line());
            assert_eq!(Some(2), err.field());
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn serialize_map_fails() {
    let mut map = std::collections::BTreeMap::new();
    map.insert("a", 1);
    let mut wtr = libcsv::Writer::from_writer(vec![]).unwrap();
    assert!(matches!(wtr.serialize(&map), Err(Error::Serialize(_))));
}
