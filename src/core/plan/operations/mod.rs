pub mod convert_units;
pub mod currency;
pub mod export;
pub mod filters;
pub mod format_date;
pub mod rename;
pub mod translate;

use crate::core::plan::operation::OperationRegistryBuilder;

/// Register the built-in operations into the supplied builder.
pub fn register_builtins(builder: &mut OperationRegistryBuilder) {
    builder
        .register(rename::RenameColumnsOperation::new())
        .register(format_date::FormatDateOperation::new())
        .register(translate::TranslateValuesOperation::new())
        .register(convert_units::ConvertUnitsOperation::new())
        .register(filters::FilterEqualsOperation::new())
        .register(filters::FilterContainsOperation::new())
        .register(filters::FilterCompareOperation::new())
        .register(filters::FilterBetweenOperation::new())
        .register(currency::CurrencyToOperation::new())
        .register(export::ExportOperation::new());
}
