//! Shared fixtures: three unit-square counties in a row, the first two in
//! state 01 and the third in state 02.
//!
//! ```text
//!  (0,1)---(1,1)---(2,1)---(3,1)
//!    | 1001  |  1003 |  9999 |
//!  (0,0)---(1,0)---(2,0)---(3,0)
//! ```

use serde_json::json;

use crate::processing::build_model;
use crate::topology::TopologyDocument;
use crate::types::{Datasets, EducationRecord, MapModel};

pub fn three_county_topology() -> TopologyDocument {
    serde_json::from_value(three_county_topology_json()).unwrap()
}

pub fn three_county_topology_json() -> serde_json::Value {
    json!({
        "type": "Topology",
        "objects": {
            "counties": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": 1001, "arcs": [[0, 2]] },
                    { "type": "Polygon", "id": 1003, "arcs": [[3, 1, 4, -1]] },
                    { "type": "Polygon", "id": 9999, "arcs": [[5, -2]] }
                ]
            },
            "states": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": "01", "arcs": [[2, 3, 1, 4]] },
                    { "type": "Polygon", "id": "02", "arcs": [[5, -2]] }
                ]
            }
        },
        "arcs": [
            [[1, 0], [1, 1]],
            [[2, 0], [2, 1]],
            [[1, 1], [0, 1], [0, 0], [1, 0]],
            [[1, 0], [2, 0]],
            [[2, 1], [1, 1]],
            [[2, 0], [3, 0], [3, 1], [2, 1]]
        ]
    })
}

pub fn sample_records() -> Vec<EducationRecord> {
    vec![
        EducationRecord {
            fips: 1001,
            state: "AL".to_string(),
            area_name: "Autauga County".to_string(),
            bachelors_or_higher: 22.5,
        },
        EducationRecord {
            fips: 1003,
            state: "AL".to_string(),
            area_name: "Baldwin County".to_string(),
            bachelors_or_higher: 61.0,
        },
        EducationRecord {
            fips: 4242,
            state: "ZZ".to_string(),
            area_name: "Nowhere County".to_string(),
            bachelors_or_higher: 10.0,
        },
    ]
}

pub fn sample_model() -> MapModel {
    build_model(&Datasets {
        education: sample_records(),
        topology: three_county_topology(),
    })
    .unwrap()
}
