use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::errors::ModelError;
use crate::validation;

/// Catalog entry keyed by `codigo`. `cantidad` is the current stock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub codigo: String,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
    pub cantidad: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio_unitario: Decimal,
    pub categoria: String,
}

/// Create payload. Fields are optional so a missing one is reported by name
/// instead of failing deserialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub codigo: Option<String>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub cantidad: Option<Number>,
    pub precio_unitario: Option<Number>,
    pub categoria: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<Product, ModelError> {
        let codigo = validation::require_text("codigo", self.codigo.as_deref())?;
        validation::validate_codigo(&codigo)?;
        let nombre = validation::require_text("nombre", self.nombre.as_deref())?;
        let categoria = validation::require_text("categoria", self.categoria.as_deref())?;
        let cantidad = validation::non_negative_integer("cantidad", validation::require("cantidad", self.cantidad.as_ref())?)?;
        let precio_unitario = validation::price("precio_unitario", validation::require("precio_unitario", self.precio_unitario.as_ref())?)?;

        Ok(Product {
            codigo,
            nombre,
            descripcion: self.descripcion.clone().unwrap_or_default(),
            cantidad,
            precio_unitario,
            categoria,
        })
    }
}

/// Quantity overwrite payload. With `cantidad_esperada` the write only
/// happens while the stored quantity still equals it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuantityUpdate {
    pub cantidad: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cantidad_esperada: Option<Number>,
}

impl QuantityUpdate {
    pub fn unconditional(cantidad: u64) -> Self {
        Self { cantidad: Some(cantidad.into()), cantidad_esperada: None }
    }

    pub fn conditional(expected: u64, cantidad: u64) -> Self {
        Self { cantidad: Some(cantidad.into()), cantidad_esperada: Some(expected.into()) }
    }

    /// Returns `(new_quantity, expected_quantity)`.
    pub fn validate(&self) -> Result<(u64, Option<u64>), ModelError> {
        let cantidad = validation::non_negative_integer("cantidad", validation::require("cantidad", self.cantidad.as_ref())?)?;
        let expected = self
            .cantidad_esperada
            .as_ref()
            .map(|n| validation::non_negative_integer("cantidad_esperada", n))
            .transpose()?;
        Ok((cantidad, expected))
    }
}

/// Before/after stock summary returned with every processed note.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityChange {
    pub codigo: String,
    pub previous_quantity: u64,
    pub new_quantity: u64,
}
