//! Built-in tools.
//!
//! `color_to_hex` backs the default system prompt: it resolves CSS colour
//! names to hex codes and normalizes hex literals the user types directly.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::error::{BridgeError, Result};
use crate::tools::tool::{AgentTool, Tool};
use crate::tools::types::ToolParameters;
use crate::types::ToolOutput;

pub const COLOR_TO_HEX: &str = "color_to_hex";

const CSS_COLORS: &[(&str, &str)] = &[
    ("aqua", "#00FFFF"),
    ("azure", "#F0FFFF"),
    ("beige", "#F5F5DC"),
    ("black", "#000000"),
    ("blue", "#0000FF"),
    ("brown", "#A52A2A"),
    ("coral", "#FF7F50"),
    ("crimson", "#DC143C"),
    ("cyan", "#00FFFF"),
    ("darkblue", "#00008B"),
    ("darkgreen", "#006400"),
    ("darkred", "#8B0000"),
    ("fuchsia", "#FF00FF"),
    ("gold", "#FFD700"),
    ("gray", "#808080"),
    ("green", "#008000"),
    ("grey", "#808080"),
    ("indigo", "#4B0082"),
    ("ivory", "#FFFFF0"),
    ("khaki", "#F0E68C"),
    ("lavender", "#E6E6FA"),
    ("lightblue", "#ADD8E6"),
    ("lightgreen", "#90EE90"),
    ("lime", "#00FF00"),
    ("magenta", "#FF00FF"),
    ("maroon", "#800000"),
    ("navy", "#000080"),
    ("olive", "#808000"),
    ("orange", "#FFA500"),
    ("orchid", "#DA70D6"),
    ("pink", "#FFC0CB"),
    ("plum", "#DDA0DD"),
    ("purple", "#800080"),
    ("red", "#FF0000"),
    ("salmon", "#FA8072"),
    ("silver", "#C0C0C0"),
    ("skyblue", "#87CEEB"),
    ("tan", "#D2B48C"),
    ("teal", "#008080"),
    ("tomato", "#FF6347"),
    ("turquoise", "#40E0D0"),
    ("violet", "#EE82EE"),
    ("white", "#FFFFFF"),
    ("yellow", "#FFFF00"),
];

/// Structured result of `color_to_hex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorHex {
    pub color: String,
    pub hex: String,
}

fn hex_literal() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| {
        Regex::new(r"^#?(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})$").expect("hex literal regex must compile")
    })
}

/// Resolve a colour name or hex literal to an uppercase `#RRGGBB` code.
pub fn resolve_color(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if hex_literal().is_match(trimmed) {
        let digits = trimmed.trim_start_matches('#').to_ascii_uppercase();
        let expanded = if digits.len() == 3 {
            digits.chars().flat_map(|c| [c, c]).collect()
        } else {
            digits
        };
        return Some(format!("#{expanded}"));
    }

    let key: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    CSS_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, hex)| (*hex).to_string())
}

/// The `color_to_hex` tool.
pub fn color_to_hex_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        COLOR_TO_HEX,
        "Convert a colour name (e.g. \"red\", \"sky blue\") or hex literal to its #RRGGBB hex code",
        ToolParameters::object()
            .string("color", "Colour name or hex literal", true)
            .build(),
        |args| async move {
            let color = args.get_str("color")?;
            let hex = resolve_color(color).ok_or_else(|| BridgeError::ToolExecution {
                tool_name: COLOR_TO_HEX.to_string(),
                message: format!("unknown colour: {color}"),
            })?;
            Ok(ToolOutput::structured(ColorHex {
                color: color.to_string(),
                hex,
            }))
        },
    ))
}
