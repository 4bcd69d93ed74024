use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use crate::errors::ModelError;
use crate::validation;

/// Direction of a stock movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    /// Stock received.
    Entrada,
    /// Stock issued.
    Salida,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Entrada => "entrada",
            NoteType::Salida => "salida",
        }
    }

    /// New stock after moving `amount`; `None` when it would overflow or go negative.
    pub fn apply(self, current: u64, amount: u64) -> Option<u64> {
        match self {
            NoteType::Entrada => current.checked_add(amount),
            NoteType::Salida => current.checked_sub(amount),
        }
    }
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only stock movement record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryNote {
    pub id: Uuid,
    pub fecha: DateTime<Utc>,
    pub codigo: String,
    pub cantidad: u64,
    pub tipo: NoteType,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl InventoryNote {
    pub fn new(valid: ValidNote, tipo: NoteType) -> Self {
        Self {
            id: Uuid::new_v4(),
            fecha: valid.fecha,
            codigo: valid.codigo,
            cantidad: valid.cantidad,
            tipo,
            created_at: Utc::now(),
        }
    }
}

/// Raw note payload as posted by clients.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NoteInput {
    pub fecha: Option<String>,
    pub codigo: Option<String>,
    pub cantidad: Option<Number>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidNote {
    pub fecha: DateTime<Utc>,
    pub codigo: String,
    pub cantidad: u64,
}

impl NoteInput {
    pub fn validate(&self) -> Result<ValidNote, ModelError> {
        if self.fecha.is_none() || self.codigo.is_none() || self.cantidad.is_none() {
            return Err(ModelError::validation("required fields: fecha, codigo, cantidad"));
        }
        let fecha_raw = validation::require_text("fecha", self.fecha.as_deref())?;
        let codigo = validation::require_text("codigo", self.codigo.as_deref())?;
        validation::validate_codigo(&codigo)?;
        let cantidad = validation::positive_integer("cantidad", validation::require("cantidad", self.cantidad.as_ref())?)?;
        let fecha = validation::parse_fecha(&fecha_raw)?;
        Ok(ValidNote { fecha, codigo, cantidad })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(v: serde_json::Value) -> NoteInput {
        serde_json::from_value(v).expect("payload")
    }

    #[test]
    fn apply_respects_floor_and_ceiling() {
        assert_eq!(NoteType::Entrada.apply(10, 5), Some(15));
        assert_eq!(NoteType::Salida.apply(10, 7), Some(3));
        assert_eq!(NoteType::Salida.apply(3, 5), None);
        assert_eq!(NoteType::Entrada.apply(u64::MAX, 1), None);
    }

    #[test]
    fn note_type_wire_format() {
        assert_eq!(serde_json::to_value(NoteType::Salida).expect("json"), json!("salida"));
        assert_eq!(serde_json::from_value::<NoteType>(json!("entrada")).expect("json"), NoteType::Entrada);
        assert!(serde_json::from_value::<NoteType>(json!("ajuste")).is_err());
    }

    #[test]
    fn valid_note() {
        let v = input(json!({ "fecha": "2024-05-10", "codigo": "A1", "cantidad": 7 }))
            .validate()
            .expect("valid");
        assert_eq!(v.codigo, "A1");
        assert_eq!(v.cantidad, 7);
        let note = InventoryNote::new(v, NoteType::Salida);
        let body = serde_json::to_value(&note).expect("json");
        assert_eq!(body["tipo"], "salida");
        assert!(body.get("createdAt").is_some());
    }

    #[test]
    fn invalid_notes() {
        for bad in [
            json!({ "codigo": "A1", "cantidad": 1 }),
            json!({ "fecha": "2024-05-10", "cantidad": 1 }),
            json!({ "fecha": "2024-05-10", "codigo": "A1" }),
            json!({ "fecha": "2024-05-10", "codigo": "A1", "cantidad": 0 }),
            json!({ "fecha": "2024-05-10", "codigo": "A1", "cantidad": -4 }),
            json!({ "fecha": "2024-05-10", "codigo": "A1", "cantidad": 1.5 }),
            json!({ "fecha": "no es fecha", "codigo": "A1", "cantidad": 1 }),
        ] {
            assert!(input(bad.clone()).validate().is_err(), "{bad}");
        }
    }
}
