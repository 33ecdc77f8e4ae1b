//! Persisted JSON document format.
//!
//! `{ metadata, elements, connections, layers, activeLayer, version: "1.0" }`.
//! Connections reference their endpoints by element id. Loading checks
//! every reference and rebuilds the derived geometry, so a loaded scene
//! satisfies the same invariants as one built through the editor.

use crate::id::ObjectId;
use crate::model::{Connection, Element, Layer, Metadata};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported document version `{0}`")]
    UnsupportedVersion(String),
    #[error("duplicate element id `{0}`")]
    DuplicateId(String),
    #[error("connection `{connection}` references missing element `{element}`")]
    DanglingConnection { connection: String, element: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    metadata: &'a Metadata,
    elements: &'a [Element],
    connections: &'a [Connection],
    layers: &'a [Layer],
    active_layer: ObjectId,
    version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentIn {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default)]
    active_layer: Option<ObjectId>,
    #[serde(default = "default_version")]
    version: String,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// Serialize a scene to pretty-printed JSON.
///
/// # Errors
/// Only fails if `serde_json` does, which the model types do not trigger.
pub fn save_document(scene: &Scene) -> Result<String, DocumentError> {
    let doc = DocumentOut {
        metadata: &scene.metadata,
        elements: scene.elements(),
        connections: scene.connections(),
        layers: scene.layers(),
        active_layer: scene.active_layer(),
        version: DOCUMENT_VERSION,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Load a scene saved by [`save_document`].
///
/// Missing layers are recreated, elements on unknown layers move to the
/// default layer, self-connections are dropped, and geometry caches are
/// rebuilt.
///
/// # Errors
/// Malformed JSON, a major version other than 1, duplicate element ids,
/// or a connection naming an element that does not exist.
pub fn load_document(text: &str) -> Result<Scene, DocumentError> {
    let doc: DocumentIn = serde_json::from_str(text)?;
    if doc.version.split('.').next() != Some("1") {
        return Err(DocumentError::UnsupportedVersion(doc.version));
    }

    let mut ids = HashSet::new();
    for el in &doc.elements {
        if !ids.insert(el.id) {
            return Err(DocumentError::DuplicateId(el.id.to_string()));
        }
    }

    let mut connections = Vec::with_capacity(doc.connections.len());
    for conn in doc.connections {
        for end in [conn.start_element_id, conn.end_element_id] {
            if !ids.contains(&end) {
                return Err(DocumentError::DanglingConnection {
                    connection: conn.id.to_string(),
                    element: end.to_string(),
                });
            }
        }
        if conn.start_element_id == conn.end_element_id {
            log::warn!("dropping self-connection {} on load", conn.id);
            continue;
        }
        connections.push(conn);
    }

    let mut layers = doc.layers;
    if layers.is_empty() {
        layers.push(Layer::base());
    }
    let fallback = layers
        .iter()
        .find(|l| l.id == Layer::default_id())
        .unwrap_or(&layers[0])
        .id;
    let layer_ids: HashSet<ObjectId> = layers.iter().map(|l| l.id).collect();

    let mut elements = doc.elements;
    for el in &mut elements {
        if !layer_ids.contains(&el.layer) {
            log::warn!("element {} on unknown layer {}, moving to {fallback}", el.id, el.layer);
            el.layer = fallback;
        }
        el.style.sanitize();
        let (w, h) = (el.width, el.height);
        el.set_size(w, h);
    }

    let active_layer = doc
        .active_layer
        .filter(|id| layer_ids.contains(id))
        .unwrap_or(fallback);

    let mut scene = Scene {
        elements,
        connections,
        layers,
        active_layer,
        metadata: doc.metadata,
    };
    scene.refresh_geometry();
    log::debug!(
        "loaded document `{}`: {} element(s), {} connection(s)",
        scene.metadata.flow_title,
        scene.elements().len(),
        scene.connections().len()
    );
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::ElementKind;
    use pretty_assertions::assert_eq;

    fn sample() -> Scene {
        let mut scene = Scene::new();
        scene.metadata.flow_title = "Expense Approval".into();
        let a = scene.add_element(ElementKind::Start, Point::new(100.0, 100.0)).id;
        let b = scene.add_element(ElementKind::Decision, Point::new(100.0, 250.0)).id;
        scene.set_annotation(b, Some("Approved".into()));
        let conn = scene.create_connection(a, b).unwrap().id;
        scene.set_connection_label(conn, "submit");
        scene
    }

    #[test]
    fn save_load_roundtrip() {
        let scene = sample();
        let json = save_document(&scene).unwrap();
        assert!(json.contains("\"version\": \"1.0\""));
        assert!(json.contains("\"startElementId\""));
        assert!(json.contains("\"type\": \"decision\""));
        let loaded = load_document(&json).unwrap();
        assert_eq!(loaded, scene);
    }

    #[test]
    fn dangling_connection_is_rejected() {
        let json = r##"{
            "elements": [],
            "connections": [{
                "id": "c1", "startElementId": "a", "endElementId": "b",
                "startPoint": {"x": 0, "y": 0}, "endPoint": {"x": 1, "y": 1}
            }],
            "version": "1.0"
        }"##;
        let err = load_document(json).unwrap_err();
        assert!(matches!(err, DocumentError::DanglingConnection { .. }));
    }

    #[test]
    fn missing_layers_and_metadata_get_defaults() {
        let json = r##"{
            "elements": [{
                "id": "n1", "type": "note", "x": 10, "y": 20, "width": 5, "height": 90,
                "fillColor": "#ffeb3b", "borderColor": "transparent", "borderWidth": 2,
                "opacity": 100, "rotation": 0, "fontSize": 14, "fontWeight": "normal",
                "textAlign": "left", "text": "hello", "layer": "ghost"
            }]
        }"##;
        let scene = load_document(json).unwrap();
        assert_eq!(scene.layers().len(), 1);
        assert_eq!(scene.metadata, Metadata::default());
        let el = &scene.elements()[0];
        assert_eq!(el.layer, Layer::default_id());
        assert_eq!(el.width(), 20.0);
        assert_eq!(el.connection_points().len(), 4);
    }

    #[test]
    fn version_and_duplicates_checked() {
        let err = load_document(r#"{"version": "2.0"}"#).unwrap_err();
        assert_eq!(err.to_string(), "unsupported document version `2.0`");
        assert!(matches!(
            load_document("not json").unwrap_err(),
            DocumentError::Json(_)
        ));
    }
}
