//! `ironmetric units` command handler

use std::io::Write;

use serde::Serialize;

use ironmetric_core::error::IronmetricError;
use ironmetric_core::units::{Conversion, Unit, get_unit_prefix_factor};

use crate::cli::UnitsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `units` command.
pub fn execute(args: UnitsArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let report = build_report(&args)?;
    writer.render(&report)?;
    Ok(())
}

/// Parse the input unit and, when `--to` is given, compute the conversion.
///
/// # Errors
///
/// Returns `CliError::Core` if either unit cannot be parsed or the two
/// units cannot be converted into each other.
pub fn build_report(args: &UnitsArgs) -> Result<UnitReport, CliError> {
    let unit: Unit = args.unit.parse().map_err(IronmetricError::from)?;

    let conversion = match &args.to {
        Some(to) => {
            let target: Unit = to.parse().map_err(IronmetricError::from)?;
            let conversion =
                get_unit_prefix_factor(&unit, &target).map_err(IronmetricError::from)?;
            Some(ConversionReport {
                to: to.clone(),
                to_short: target.short(),
                function: describe(conversion),
                value: args.value,
                converted: args.value.map(|v| conversion.apply(v)),
            })
        }
        None => None,
    };

    Ok(UnitReport {
        input: args.unit.clone(),
        short: unit.short(),
        long: unit.to_string(),
        prefix: unit.prefix.symbol().to_owned(),
        measure: unit.measure.short().to_owned(),
        divisor: unit.divisor.map(|d| d.short().to_owned()),
        conversion,
    })
}

fn describe(conversion: Conversion) -> String {
    match conversion {
        Conversion::Scale(factor) => format!("x {factor}"),
        Conversion::CelsiusToFahrenheit => "c * 1.8 + 32".to_owned(),
        Conversion::FahrenheitToCelsius => "(f - 32) / 1.8".to_owned(),
    }
}

/// Parsed unit and optional conversion.
#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub input: String,
    pub short: String,
    pub long: String,
    pub prefix: String,
    pub measure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divisor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionReport>,
}

#[derive(Debug, Serialize)]
pub struct ConversionReport {
    pub to: String,
    pub to_short: String,
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<f64>,
}

impl Render for UnitReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Unit: {} -> {}", self.input, self.short.bold())?;
        writeln!(w, "  Long:    {}", self.long)?;
        let prefix = if self.prefix.is_empty() {
            "(none)"
        } else {
            self.prefix.as_str()
        };
        writeln!(w, "  Prefix:  {}", prefix)?;
        writeln!(w, "  Measure: {}", self.measure)?;
        if let Some(divisor) = &self.divisor {
            writeln!(w, "  Divisor: {}", divisor)?;
        }
        if let Some(c) = &self.conversion {
            writeln!(w, "Conversion: {} -> {} ({})", self.short, c.to_short, c.function)?;
            if let (Some(value), Some(converted)) = (c.value, c.converted) {
                writeln!(
                    w,
                    "  {} {} = {} {}",
                    value,
                    self.short,
                    converted.to_string().green(),
                    c.to_short
                )?;
            }
        }
        Ok(())
    }
}
