//! Localized, user-facing validation messages.

use remitcap_core::{Locale, Money};
use serde::{Deserialize, Serialize};

/// A validation failure, rendered per locale at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Required,
    TooShort { min: usize },
    TooLong { max: usize },
    InvalidEmail,
    InvalidPhone,
    InvalidDocument,
    InvalidFiscalCode,
    InvalidAmount,
    AmountNotPositive,
    AmountAboveCeiling { ceiling: Money },
    InvalidDate,
    FutureDate,
    Underage { min_years: u32 },
    WeakPassword { min: usize },
    CommissionNegative,
    CommissionAboveAmount,
    CommissionConsumesAmount,
    /// Input carried an injection payload.
    Security,
}

impl Message {
    /// Render the message in the given locale.
    pub fn text(&self, locale: Locale) -> String {
        match locale {
            Locale::Es => self.spanish(),
            Locale::En => self.english(),
        }
    }

    fn spanish(&self) -> String {
        match self {
            Message::Required => "Este campo es obligatorio".to_string(),
            Message::TooShort { min } => format!("Debe tener al menos {min} caracteres"),
            Message::TooLong { max } => format!("No puede superar {max} caracteres"),
            Message::InvalidEmail => "Correo electrónico no válido".to_string(),
            Message::InvalidPhone => "Número de teléfono no válido".to_string(),
            Message::InvalidDocument => {
                "Documento no válido: solo letras, números y guiones".to_string()
            }
            Message::InvalidFiscalCode => "Código fiscal no válido".to_string(),
            Message::InvalidAmount => "Importe no válido".to_string(),
            Message::AmountNotPositive => "El importe debe ser mayor que cero".to_string(),
            Message::AmountAboveCeiling { ceiling } => {
                format!("El importe no puede superar {ceiling} €")
            }
            Message::InvalidDate => "Fecha no válida (AAAA-MM-DD)".to_string(),
            Message::FutureDate => "La fecha no puede ser futura".to_string(),
            Message::Underage { min_years } => {
                format!("El cliente debe tener al menos {min_years} años")
            }
            Message::WeakPassword { min } => format!(
                "La contraseña debe tener al menos {min} caracteres, una mayúscula, una minúscula y un número"
            ),
            Message::CommissionNegative => "La comisión no puede ser negativa".to_string(),
            Message::CommissionAboveAmount => {
                "La comisión no puede superar el importe".to_string()
            }
            Message::CommissionConsumesAmount => {
                "La comisión debe ser menor que el importe".to_string()
            }
            Message::Security => {
                "El valor contiene caracteres no permitidos por motivos de seguridad".to_string()
            }
        }
    }

    fn english(&self) -> String {
        match self {
            Message::Required => "This field is required".to_string(),
            Message::TooShort { min } => format!("Must be at least {min} characters"),
            Message::TooLong { max } => format!("Must be at most {max} characters"),
            Message::InvalidEmail => "Invalid email address".to_string(),
            Message::InvalidPhone => "Invalid phone number".to_string(),
            Message::InvalidDocument => {
                "Invalid document: only letters, digits and hyphens".to_string()
            }
            Message::InvalidFiscalCode => "Invalid fiscal code".to_string(),
            Message::InvalidAmount => "Invalid amount".to_string(),
            Message::AmountNotPositive => "Amount must be greater than zero".to_string(),
            Message::AmountAboveCeiling { ceiling } => {
                format!("Amount cannot exceed {ceiling} €")
            }
            Message::InvalidDate => "Invalid date (YYYY-MM-DD)".to_string(),
            Message::FutureDate => "Date cannot be in the future".to_string(),
            Message::Underage { min_years } => {
                format!("Customer must be at least {min_years} years old")
            }
            Message::WeakPassword { min } => format!(
                "Password needs at least {min} characters with upper case, lower case and a digit"
            ),
            Message::CommissionNegative => "Commission cannot be negative".to_string(),
            Message::CommissionAboveAmount => "Commission cannot exceed the amount".to_string(),
            Message::CommissionConsumesAmount => {
                "Commission must be lower than the amount".to_string()
            }
            Message::Security => "Value contains characters rejected for security".to_string(),
        }
    }
}
