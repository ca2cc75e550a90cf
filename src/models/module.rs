// src/models/module.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'training_modules' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrainingModule {
    pub module_id: i64,
    pub module_name: String,
    pub description: Option<String>,

    /// Zero means the module is free; any other value requires a purchase.
    pub price: Decimal,

    pub is_compulsory: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TrainingModule {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    fn module(price: Decimal) -> super::TrainingModule {
        super::TrainingModule {
            module_id: 1,
            module_name: "Jungle Safety".to_string(),
            description: None,
            price,
            is_compulsory: false,
            created_at: None,
        }
    }

    #[test]
    fn zero_price_is_free_regardless_of_scale() {
        assert!(module(Decimal::ZERO).is_free());
        assert!(module(Decimal::new(0, 2)).is_free());
        assert!(!module(Decimal::new(2500, 2)).is_free());
    }
}
