//! Handler de la etapa 7 (Deck build).
//!
//! El stub no renderiza PPTX real (eso es un colaborador externo): serializa
//! el manifiesto del deck como binario opaco `deck.pptx` y emite el payload
//! de inspección post-etapa que consume el gate de template. Los valores
//! reportados por el stub cumplen el contrato por construcción; el gate los
//! verifica igual cuando el flag estricto está activo.

use phase_core::model::{DeckInspection, ShapeInspection, SlideInspection, TableInspection};
use phase_core::store::EventKind;
use phase_core::{HandlerError, StageContext, StageHandler, StageResult};
use serde_json::json;

use crate::outputs::{DeckManifest, DeckOutline};

const TITLE_X: f64 = 0.5;
const TITLE_Y: f64 = 0.4;

pub struct DeckHandler;

impl StageHandler for DeckHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let outline: DeckOutline = ctx.output_as("6")?;

        let manifest = DeckManifest { slides: outline.slides.clone(),
                                      template: "corporate-blue-16x9".to_string() };
        let deck_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| HandlerError::new(format!("serialize deck manifest: {e}")))?;

        let inspection = DeckInspection {
            slides: manifest.slides
                            .iter()
                            .map(|slide| SlideInspection {
                                key: slide.key.clone(),
                                shapes: vec![ShapeInspection { name: "title".to_string(),
                                                               x: TITLE_X,
                                                               y: TITLE_Y,
                                                               expected_x: Some(TITLE_X),
                                                               expected_y: Some(TITLE_Y),
                                                               fill_color: Some("#1F3864".to_string()),
                                                               font: Some("Calibri".to_string()) }],
                                tables: if slide.key == "slide-03-sizing" {
                                    vec![TableInspection { name: "sizing-table".to_string(), has_borders: true }]
                                } else {
                                    vec![]
                                },
                            })
                            .collect(),
        };

        let slide_count = manifest.slides.len();
        let data = json!({
            "slideCount": slide_count,
            "template": manifest.template,
            "deckBytes": deck_bytes.len(),
        });
        Ok(StageResult::with_data(data)
            .binary("deck.pptx", deck_bytes)
            .inspection(inspection)
            .metrics(json!({ "slideCount": slide_count }))
            .event(EventKind::Info, "deck rendered", Some(json!({ "slideCount": slide_count }))))
    }
}
