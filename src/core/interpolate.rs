//! 输入插值：将模板中的 `{name}` 占位符替换为本次 kickoff 的输入值
//!
//! 单遍替换，替换进来的值不会再次被扫描；任一占位符缺少输入即失败，不做部分替换。

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::core::InterpolationError;

/// 一次 kickoff 的输入（占位符名 -> 值）
pub type Inputs = HashMap<String, String>;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// 返回模板中声明的占位符名（按首次出现顺序去重）
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in placeholder_re().captures_iter(template) {
        if let Some(m) = caps.get(1) {
            if !names.contains(&m.as_str()) {
                names.push(m.as_str());
            }
        }
    }
    names
}

/// 替换模板中的所有占位符；`field` 仅用于错误信息（如 "task 'propose' description"）
pub fn interpolate(template: &str, inputs: &Inputs, field: &str) -> Result<String, InterpolationError> {
    if let Some(missing) = placeholders(template)
        .into_iter()
        .find(|name| !inputs.contains_key(*name))
    {
        return Err(InterpolationError::MissingPlaceholderValue {
            field: field.to_string(),
            placeholder: missing.to_string(),
        });
    }

    let rendered = placeholder_re().replace_all(template, |caps: &Captures| {
        inputs.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}
