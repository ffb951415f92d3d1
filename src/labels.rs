//! Pull request labels.
//!
//! Labels are given as two comma-separated lists: names and colors. They
//! are zipped in order; a label without a color gets a random one.

use log::{debug, warn};
use rand::Rng;
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// A label attached to every delivery pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    /// Six hexadecimal digits, without `#`.
    pub color: String,
}

/// Parses the label and color lists using the thread-local RNG for missing
/// colors.
pub fn parse_labels(labels: &str, colors: &str) -> Result<Vec<Label>> {
    parse_labels_with_rng(labels, colors, &mut rand::thread_rng())
}

pub fn parse_labels_with_rng<R: Rng>(
    labels: &str,
    colors: &str,
    rng: &mut R,
) -> Result<Vec<Label>> {
    let color_pattern = Regex::new(r"^[0-9A-Fa-f]{6}$")?;
    let names = split_list(labels);
    let colors = split_list(colors);

    for color in &colors {
        if !color_pattern.is_match(color) {
            return Err(Error::Label {
                label: color.clone(),
                message: format!(
                    "invalid color code, must match {}",
                    color_pattern.as_str()
                ),
            });
        }
    }
    if colors.len() > names.len() {
        warn!(
            "{} label colors given for {} labels, extra colors are ignored",
            colors.len(),
            names.len()
        );
    }

    let mut colors = colors.into_iter();
    let labels = names
        .into_iter()
        .map(|name| {
            let color = colors
                .next()
                .unwrap_or_else(|| format!("{:06X}", rng.gen_range(0..0x100_0000u32)));
            Label { name, color }
        })
        .collect::<Vec<_>>();
    debug!("Pull request labels: {:?}", labels);
    Ok(labels)
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
