// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Built-in demo dataset used when the data source resolves to local.

use serde_json::{json, Value};

use super::history::{HistoryEntry, HistoryResponse};

/// Demo product documents in lookup order.
///
/// Fuzzy id correction walks this list front to back, so the order is part of
/// the observable behavior.
#[must_use]
pub fn demo_documents() -> Vec<(&'static str, Value)> {
    vec![
        ("MED-1", medikament()),
        ("HERSTELLER-1", hersteller()),
        ("UNIT-1", unit()),
    ]
}

fn medikament() -> Value {
    json!({
        "identifikation": {
            "medikamenten_id": "MED-1",
            "pzn": "08296572",
            "name": "Aspirin 500mg",
            "handelsname": "Aspirin® 500mg Tabletten",
            "hersteller": "Bayer AG",
            "hersteller_referenz": "HERSTELLER-1",
            "zulassungsnummer": "DE-12345-67890",
            "produktwebsite": "https://www.aspirin.de/produkte/aspirin-500mg"
        },
        "wirkstoff": {
            "hauptwirkstoff": "Acetylsalicylsäure",
            "cas_nummer": "50-78-2",
            "menge_pro_einheit": "500mg",
            "reinheit": "99.5%",
            "herkunft": "Synthetisch",
            "molekulargewicht": "180.16 g/mol"
        },
        "darreichungsform": {
            "form": "Tabletten",
            "farbe": "Weiß",
            "gewicht_pro_tablette": "650mg",
            "teilbarkeit": true,
            "beschichtung": "Filmtablette"
        },
        "verpackung": {
            "packungsgroesse": 20,
            "einheit": "Stück",
            "verpackungsart": "Blister",
            "kindersicherung": false,
            "verknuepfte_units": ["UNIT-1"]
        },
        "haltbarkeit": {
            "verfallsdatum": "12/2026",
            "haltbarkeitsdauer": "36 Monate",
            "lagerungsbedingungen": {
                "temperatur": "unter 25°C",
                "luftfeuchtigkeit": "unter 60%",
                "besondere_hinweise": "Trocken lagern"
            }
        },
        "anwendung": {
            "indikationen": ["Leichte bis mäßige Schmerzen", "Fieber", "Entzündungen", "Kopfschmerzen"],
            "dosierung": {
                "erwachsene": "1-2 Tabletten alle 4-6 Stunden",
                "max_tagesdosis": "6 Tabletten (3000mg)",
                "kinder_unter_12": "Nicht empfohlen"
            }
        },
        "regulatorische_daten": {
            "zulassungsinhaber": "Bayer Vital GmbH",
            "zulassungsdatum": "15.03.2018",
            "pharmakovigilanz": {
                "meldungen_2023": 12,
                "schwerwiegende_ereignisse": 2,
                "letzter_bericht": "31.12.2023"
            }
        },
        "_meta_popup_warnung": "Dieses Medikament sollte nicht mit Alkohol eingenommen werden.",
        "_meta_popup_hinweis": {
            "author": "Pharmakovigilanz",
            "message": "Neue Sicherheitsinformationen verfügbar. Bitte Fachinformation beachten.",
            "type": "info",
            "priority": 1
        },
        "_meta_popup_qualitaet": {
            "author": "QS-Team",
            "message": "Charge wurde erfolgreich freigegeben. Alle Tests bestanden.",
            "type": "success",
            "priority": 0
        },
        "_meta_lieferkette_produktion": {
            "title": "Produktions-Lieferkette",
            "Dr. Schmidt": "2024-07-01T14:32:00Z",
            "QS-Team": "2024-07-01T15:45:00Z",
            "Verpackung": "2024-07-01T16:00:00Z"
        },
        "_meta_lieferkette_distribution": {
            "title": "Distributions-Lieferkette",
            "Lager Köln": "2024-07-01T18:00:00Z",
            "Transport DHL": "2024-07-01T20:30:00Z",
            "Hub Berlin": "2024-07-02T06:15:00Z",
            "Zustellung": "2024-07-02T08:30:00Z"
        }
    })
}

fn hersteller() -> Value {
    json!({
        "unternehmensdaten": {
            "hersteller_id": "HERSTELLER-1",
            "firmenname": "Bayer AG",
            "rechtsform": "Aktiengesellschaft",
            "hauptsitz": "Leverkusen, Deutschland",
            "gruendungsjahr": 1863,
            "mitarbeiterzahl": 99538,
            "boersensymbol": "BAYN",
            "verknuepfte_medikamente": ["MED-1"],
            "produzierte_units": ["UNIT-1"]
        },
        "produktionsstandorte": [
            {
                "standort_id": "DE-LEV-001",
                "name": "Werk Leverkusen",
                "adresse": "Kaiser-Wilhelm-Allee 1, 51368 Leverkusen",
                "spezialisierung": ["Tabletten", "Kapseln", "Injektionslösungen"],
                "mitarbeiter": 8500
            },
            {
                "standort_id": "DE-BER-002",
                "name": "Werk Berlin",
                "adresse": "Müllerstraße 178, 13353 Berlin",
                "spezialisierung": ["Salben", "Cremes", "Tropfen"],
                "mitarbeiter": 3200
            }
        ],
        "qualitaetsmanagement": {
            "gmp_zertifizierung": {
                "nummer": "DE-NW-05-MIA-2024",
                "gueltig_bis": "31.12.2025",
                "aussteller": "Regierung von Düsseldorf"
            },
            "qualitaetskontrolle": {
                "pruefungen_pro_charge": 15,
                "bestehensquote": "99.7%"
            }
        },
        "_meta_popup_compliance": {
            "author": "Compliance-Team",
            "message": "Alle regulatorischen Anforderungen erfüllt. Letzte Inspektion erfolgreich.",
            "type": "success"
        },
        "_meta_lieferkette_rohstoffe": {
            "title": "Rohstoff-Lieferkette",
            "Lieferant A": "2024-06-28T10:00:00Z",
            "Qualitätsprüfung": "2024-06-28T14:30:00Z",
            "Freigabe": "2024-06-29T09:00:00Z"
        }
    })
}

fn unit() -> Value {
    json!({
        "unit_identifikation": {
            "unit_id": "UNIT-1",
            "serialnummer": "2024070115432",
            "batch_id": "BATCH-MED1-240701",
            "herstellungsdatum": "01.07.2024",
            "medikament_referenz": "MED-1",
            "hersteller_referenz": "HERSTELLER-1"
        },
        "physische_eigenschaften": {
            "verpackung": {
                "typ": "Blisterpackung",
                "material": "PVC/Aluminium",
                "bruttogewicht": "47.5g",
                "anzahl_tabletten": 20
            }
        },
        "umgebungsbedingungen": {
            "aktuelle_bedingungen": {
                "temperatur": "22.3°C",
                "luftfeuchtigkeit": "43%",
                "sensor_id": "TEMP-SENS-001"
            },
            "verlauf_24h": [
                { "zeitpunkt": "00:00", "temperatur": "21.8°C", "luftfeuchtigkeit": "45%" },
                { "zeitpunkt": "12:00", "temperatur": "22.5°C", "luftfeuchtigkeit": "41%" }
            ]
        },
        "lieferkette_tracking": {
            "aktueller_status": "Im Transit",
            "aktuelle_position": {
                "latitude": 52.52,
                "longitude": 13.405,
                "ort": "Berlin, Deutschland"
            },
            "transport_details": {
                "fahrzeug_id": "DHL-TRUCK-7834",
                "route": "Leverkusen → Berlin → Hamburg",
                "geschaetzte_ankunft": "02.07.2024 09:45:00"
            }
        },
        "lieferkette_historie": [
            {
                "station": "Produktion",
                "ort": "Bayer Werk Leverkusen",
                "datum": "01.07.2024",
                "status": "Abgeschlossen",
                "hersteller_referenz": "HERSTELLER-1"
            },
            {
                "station": "Transport Hub",
                "ort": "DHL Hub Berlin",
                "datum": "02.07.2024",
                "status": "Abgeschlossen"
            }
        ],
        "_meta_popup_transport": {
            "author": "Logistik",
            "message": "Transport läuft planmäßig. Ankunft voraussichtlich 09:45 Uhr.",
            "type": "info"
        },
        "_meta_lieferkette_transport": {
            "title": "Transport-Lieferkette",
            "Versandzentrum": "2024-07-01T20:30:00Z",
            "Hub Berlin": "2024-07-02T06:15:00Z",
            "Zustellfahrzeug": "2024-07-02T08:30:00Z",
            "Endkunde": "2024-07-02T09:45:00Z"
        }
    })
}

fn change(value: &str, timestamp: &str, user: &str, source: &str, reason: &str) -> HistoryEntry {
    HistoryEntry {
        value: value.to_string(),
        timestamp: timestamp.to_string(),
        user: Some(user.to_string()),
        source: Some(source.to_string()),
        reason: Some(reason.to_string()),
    }
}

fn record(key: &str, history: Vec<HistoryEntry>) -> HistoryResponse {
    HistoryResponse {
        key: key.to_string(),
        current_value: history.first().map(|e| e.value.clone()).unwrap_or_default(),
        total_changes: history.len(),
        history,
    }
}

/// Demo change history, keyed `<product id>.<key path>`.
#[must_use]
pub fn demo_history() -> Vec<(&'static str, HistoryResponse)> {
    vec![
        (
            "MED-1.identifikation.pzn",
            record(
                "identifikation.pzn",
                vec![
                    change("08296572", "2024-06-15T14:30:00Z", "System", "Automatische Aktualisierung", "Neue PZN-Vergabe durch BfArM"),
                    change("08296571", "2024-03-20T09:15:00Z", "Dr. Schmidt", "Manuelle Korrektur", "Korrektur nach Rücksprache mit Zulassungsbehörde"),
                    change("08296570", "2024-01-10T16:45:00Z", "System", "Erstregistrierung", "Initiale PZN-Zuteilung"),
                ],
            ),
        ),
        (
            "MED-1.identifikation.name",
            record(
                "identifikation.name",
                vec![
                    change("Aspirin 500mg", "2024-05-10T11:20:00Z", "Marketing Team", "Produktname-Update", "Vereinfachung des Produktnamens"),
                    change("Aspirin 500mg Tabletten", "2024-01-10T16:45:00Z", "System", "Erstregistrierung", "Initiale Produktregistrierung"),
                ],
            ),
        ),
        (
            "MED-1.wirkstoff.menge_pro_einheit",
            record(
                "wirkstoff.menge_pro_einheit",
                vec![change("500mg", "2024-01-10T16:45:00Z", "System", "Erstregistrierung", "Initiale Wirkstoffmenge")],
            ),
        ),
        (
            "HERSTELLER-1.unternehmensdaten.firmenname",
            record(
                "unternehmensdaten.firmenname",
                vec![change("Bayer AG", "2023-12-01T10:00:00Z", "System", "Unternehmensregister", "Offizielle Firmenbezeichnung")],
            ),
        ),
        (
            "HERSTELLER-1.unternehmensdaten.hauptsitz",
            record(
                "unternehmensdaten.hauptsitz",
                vec![
                    change("Leverkusen, Deutschland", "2024-02-15T14:30:00Z", "Legal Department", "Adressaktualisierung", "Präzisierung der Hauptsitz-Angabe"),
                    change("Leverkusen", "2023-12-01T10:00:00Z", "System", "Erstregistrierung", "Initiale Hauptsitz-Angabe"),
                ],
            ),
        ),
        (
            "UNIT-1.unit_identifikation.serialnummer",
            record(
                "unit_identifikation.serialnummer",
                vec![change("2024070115432", "2024-07-01T14:32:15Z", "Production System", "Automatische Generierung", "Eindeutige Serialnummer bei Produktion")],
            ),
        ),
        (
            "UNIT-1.lieferkette_tracking.aktueller_status",
            record(
                "lieferkette_tracking.aktueller_status",
                vec![
                    change("Im Transit", "2024-07-02T08:30:00Z", "DHL System", "Tracking Update", "Fahrzeug hat Verteilzentrum verlassen"),
                    change("Im Verteilzentrum", "2024-07-02T06:15:00Z", "DHL System", "Tracking Update", "Ankunft im Berliner Hub"),
                    change("Unterwegs", "2024-07-01T20:30:00Z", "DHL System", "Tracking Update", "Abgang vom Versandzentrum Köln"),
                    change("Versandbereit", "2024-07-01T16:00:00Z", "Production System", "Qualitätskontrolle", "QC bestanden, versandbereit"),
                ],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_linked_ids, extract_meta_popups};

    #[test]
    fn test_document_order_is_fixed() {
        let ids: Vec<&str> = demo_documents().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["MED-1", "HERSTELLER-1", "UNIT-1"]);
    }

    #[test]
    fn test_medikament_links() {
        let links = extract_linked_ids(&medikament());
        assert_eq!(links.medikament.as_deref(), Some("MED-1"));
        assert_eq!(links.hersteller.as_deref(), Some("HERSTELLER-1"));
        assert_eq!(links.unit, vec!["UNIT-1"]);
        assert_eq!(extract_meta_popups(&medikament()).len(), 3);
    }

    #[test]
    fn test_history_records_consistent() {
        for (key, record) in demo_history() {
            assert!(key.ends_with(&record.key), "{}", key);
            assert_eq!(record.total_changes, record.history.len());
            assert_eq!(record.current_value, record.history[0].value);
        }
    }
}
