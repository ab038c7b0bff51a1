//! 表单检查服务 - 业务能力层
//!
//! 页面脚本只负责"把原始证据搬出来"，过滤与标签清洗都在 Rust 侧完成：
//! - 可见、可用、空值的文本类输入框
//! - 选中项为空或为占位文本的下拉框
//! - 没有任何选项被选中的单选组

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::infrastructure::JsExecutor;
use crate::models::{Dropdown, FieldKind, FormField, FormInventory, RadioGroup};
use crate::utils::text::{collapse_whitespace, normalize};

/// 定位申请弹窗容器的 JS 片段，找不到时退回 document.body
pub(crate) const FIND_CONTAINER_JS: &str = r#"
    const findContainer = () => {
        const selectors = [
            '.jobs-easy-apply-modal',
            '[data-test-modal-id="easy-apply-modal"]',
            '.jobs-easy-apply-content',
            'div[role="dialog"]',
            '.artdeco-modal',
        ];
        for (const sel of selectors) {
            const el = document.querySelector(sel);
            if (el) return el;
        }
        return document.body;
    };
"#;

/// 下拉框的占位文本
const PLACEHOLDER_OPTIONS: &[&str] = &["select an option", "select", "please select", "choose", "--"];

/// 收集原始清单的页面脚本
const COLLECT_INVENTORY_JS: &str = r#"
    const root = findContainer();
    const isVisible = (el) => {
        const style = window.getComputedStyle(el);
        const rect = el.getBoundingClientRect();
        return style.display !== 'none' && style.visibility !== 'hidden' && (rect.width > 0 || rect.height > 0);
    };
    const text = (el) => (el ? (el.innerText || el.textContent || '').trim() : '');
    const labelsFor = (el) => {
        const out = [];
        if (el.id) {
            const byFor = root.querySelector(`label[for="${CSS.escape(el.id)}"]`);
            if (byFor) out.push(text(byFor));
        }
        const wrapping = el.closest('label');
        if (wrapping) out.push(text(wrapping));
        if (el.getAttribute('aria-label')) out.push(el.getAttribute('aria-label'));
        const labelledBy = el.getAttribute('aria-labelledby');
        if (labelledBy) {
            labelledBy.split(/\s+/).forEach((id) => out.push(text(document.getElementById(id))));
        }
        const group = el.closest('.fb-dash-form-element, .jobs-easy-apply-form-element, .form-group, div');
        if (group) {
            const lbl = group.querySelector('label, legend, .fb-dash-form-element__label');
            if (lbl) out.push(text(lbl));
        }
        if (el.placeholder) out.push(el.placeholder);
        if (el.name) out.push(el.name);
        return out.filter((s) => s && s.length > 0);
    };

    const fields = Array.from(root.querySelectorAll('input, textarea'))
        .filter((el) => el.tagName === 'TEXTAREA' || ['text', 'number', 'email', 'tel', 'url', ''].includes((el.getAttribute('type') || '').toLowerCase()))
        .map((el) => ({
            kind: el.tagName === 'TEXTAREA' ? 'textarea' : ((el.getAttribute('type') || 'text').toLowerCase()),
            visible: isVisible(el),
            disabled: el.disabled || el.readOnly,
            value: el.value || '',
            labels: labelsFor(el),
        }));

    const selects = Array.from(root.querySelectorAll('select')).map((el) => ({
        visible: isVisible(el),
        disabled: el.disabled,
        selectedText: el.selectedIndex >= 0 && el.options[el.selectedIndex] ? text(el.options[el.selectedIndex]) : '',
        selectedValue: el.value || '',
        options: Array.from(el.options).map((o) => text(o)),
        labels: labelsFor(el),
    }));

    const byName = new Map();
    Array.from(root.querySelectorAll('input[type="radio"]')).forEach((el) => {
        const key = el.name || ('__radio_' + byName.size);
        if (!byName.has(key)) byName.set(key, []);
        byName.get(key).push(el);
    });
    const radioGroups = Array.from(byName.entries()).map(([name, radios]) => {
        const fieldset = radios[0].closest('fieldset');
        const legend = fieldset ? fieldset.querySelector('legend') : null;
        const labels = [];
        if (legend) labels.push(text(legend));
        if (fieldset && fieldset.getAttribute('aria-label')) labels.push(fieldset.getAttribute('aria-label'));
        const holder = fieldset || radios[0].parentElement;
        const heading = holder ? holder.querySelector('.fb-dash-form-element__label, span[data-test-form-builder-radio-button-form-component__title]') : null;
        if (heading) labels.push(text(heading));
        labels.push(name);
        return {
            name,
            visible: radios.some(isVisible) || radios.some((r) => r.parentElement && isVisible(r.parentElement)),
            checked: radios.some((r) => r.checked),
            labels: labels.filter((s) => s && s.length > 0),
            optionLabelTexts: holder
                ? Array.from(holder.querySelectorAll('[data-test-text-selectable-option__label], .fb-text-selectable__option label')).map(text)
                : [],
            idLabels: radios.map((r) => {
                const l = r.id ? document.querySelector(`label[for="${CSS.escape(r.id)}"]`) : null;
                return text(l);
            }),
            surroundingText: radios.map((r) => text(r.parentElement)),
            values: radios.map((r) => r.value || ''),
        };
    });

    return { fields, selects, radioGroups };
"#;

/// 页面脚本返回的原始输入框
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawField {
    pub kind: String,
    pub visible: bool,
    pub disabled: bool,
    pub value: String,
    pub labels: Vec<String>,
}

/// 页面脚本返回的原始下拉框
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSelect {
    pub visible: bool,
    pub disabled: bool,
    pub selected_text: String,
    pub selected_value: String,
    pub options: Vec<String>,
    pub labels: Vec<String>,
}

/// 页面脚本返回的原始单选组
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRadioGroup {
    pub name: String,
    pub visible: bool,
    pub checked: bool,
    pub labels: Vec<String>,
    /// 专用的选项标签元素
    pub option_label_texts: Vec<String>,
    /// 通过 `label[for=id]` 关联的标签，与 radio 一一对应
    pub id_labels: Vec<String>,
    /// radio 父元素的文本，与 radio 一一对应
    pub surrounding_text: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInventory {
    pub fields: Vec<RawField>,
    pub selects: Vec<RawSelect>,
    pub radio_groups: Vec<RawRadioGroup>,
}

/// 单选组选项标签的提取策略
///
/// 选项的 DOM 结构在不同页面布局之间并不一致，
/// 因此按顺序尝试多个策略，第一个返回结果的生效
pub trait OptionLabelStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, group: &RawRadioGroup) -> Option<Vec<String>>;
}

/// 专用的选项标签元素
pub struct DedicatedOptionLabels;

impl OptionLabelStrategy for DedicatedOptionLabels {
    fn name(&self) -> &'static str {
        "dedicated"
    }

    fn extract(&self, group: &RawRadioGroup) -> Option<Vec<String>> {
        non_empty_labels(&group.option_label_texts)
    }
}

/// 通过 id 关联的 label
pub struct IdAssociatedLabels;

impl OptionLabelStrategy for IdAssociatedLabels {
    fn name(&self) -> &'static str {
        "id-label"
    }

    fn extract(&self, group: &RawRadioGroup) -> Option<Vec<String>> {
        non_empty_labels(&group.id_labels)
    }
}

/// radio 周围的原始文本
pub struct SurroundingText;

impl OptionLabelStrategy for SurroundingText {
    fn name(&self) -> &'static str {
        "surrounding"
    }

    fn extract(&self, group: &RawRadioGroup) -> Option<Vec<String>> {
        // 父元素文本如果包含了整组问题，说明不是单个选项的容器
        let question = group.labels.first().map(|l| normalize(l)).unwrap_or_default();
        let texts: Vec<String> = group
            .surrounding_text
            .iter()
            .map(|t| collapse_whitespace(t))
            .filter(|t| !t.is_empty() && t.chars().count() <= 80)
            .filter(|t| question.is_empty() || !normalize(t).contains(&question))
            .collect();
        if texts.len() < 2 {
            return None;
        }
        non_empty_labels(&texts)
    }
}

/// 兜底：二元 Yes / No
pub struct BinaryDefault;

impl OptionLabelStrategy for BinaryDefault {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn extract(&self, _group: &RawRadioGroup) -> Option<Vec<String>> {
        Some(vec!["Yes".to_string(), "No".to_string()])
    }
}

fn non_empty_labels(raw: &[String]) -> Option<Vec<String>> {
    let mut labels: Vec<String> = Vec::new();
    for label in raw.iter().map(|l| clean_label(l)) {
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }
    (!labels.is_empty()).then_some(labels)
}

/// 清洗标签文本
///
/// - 合并空白
/// - 去掉末尾的 "Required" 标记
/// - 折叠视觉隐藏 span 带来的重复文本（"Phone Phone" -> "Phone"）
pub fn clean_label(raw: &str) -> String {
    let mut label = collapse_whitespace(raw);

    loop {
        let trimmed = label.trim_end_matches(['*', ' ']).to_string();
        let cut = trimmed.len().saturating_sub("required".len());
        if cut > 0
            && trimmed.is_char_boundary(cut)
            && trimmed[cut..].eq_ignore_ascii_case("required")
        {
            label = trimmed[..cut].trim_end().to_string();
        } else {
            label = trimmed;
            break;
        }
    }

    let words: Vec<&str> = label.split(' ').collect();
    if words.len() >= 2 && words.len() % 2 == 0 {
        let (first, second) = words.split_at(words.len() / 2);
        if first == second {
            label = first.join(" ");
        }
    }
    if label.len() >= 2 && label.len() % 2 == 0 && label.is_char_boundary(label.len() / 2) {
        let (first, second) = label.split_at(label.len() / 2);
        if first == second {
            label = first.to_string();
        }
    }

    label
}

fn first_label(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| clean_label(c))
        .find(|c| !c.is_empty())
}

pub fn is_placeholder(option: &str) -> bool {
    let lower = normalize(option);
    lower.is_empty() || PLACEHOLDER_OPTIONS.contains(&lower.as_str())
}

fn field_kind(raw: &str) -> FieldKind {
    match raw {
        "" | "text" => FieldKind::Text,
        "number" => FieldKind::Number,
        "textarea" => FieldKind::Textarea,
        "email" => FieldKind::Email,
        "tel" => FieldKind::Tel,
        "url" => FieldKind::Url,
        _ => FieldKind::Other,
    }
}

/// 表单检查器
pub struct FormInspector {
    strategies: Vec<Box<dyn OptionLabelStrategy>>,
}

impl Default for FormInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormInspector {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(DedicatedOptionLabels),
                Box::new(IdAssociatedLabels),
                Box::new(SurroundingText),
                Box::new(BinaryDefault),
            ],
        }
    }

    /// 使用自定义策略链（按顺序尝试）
    pub fn with_strategies(strategies: Vec<Box<dyn OptionLabelStrategy>>) -> Self {
        Self { strategies }
    }

    /// 枚举当前表单中所有待回答的问题
    pub async fn inspect(&self, executor: &JsExecutor) -> Result<FormInventory> {
        let js_code = format!("(() => {{ {} {} }})()", FIND_CONTAINER_JS, COLLECT_INVENTORY_JS);
        let raw: RawInventory = executor
            .eval_as(js_code)
            .await
            .context("读取表单清单失败")?;
        let inventory = self.build_inventory(&raw);
        debug!(
            "表单清单: {} 个输入框, {} 个单选组, {} 个下拉框",
            inventory.fields.len(),
            inventory.radio_groups.len(),
            inventory.dropdowns.len()
        );
        Ok(inventory)
    }

    /// 从原始证据构建清单
    pub fn build_inventory(&self, raw: &RawInventory) -> FormInventory {
        let fields = raw
            .fields
            .iter()
            .filter(|f| f.visible && !f.disabled && f.value.trim().is_empty())
            .filter_map(|f| {
                let kind = field_kind(&f.kind);
                if kind == FieldKind::Other {
                    return None;
                }
                Some(FormField {
                    label: first_label(&f.labels)?,
                    kind,
                })
            })
            .collect();

        let dropdowns = raw
            .selects
            .iter()
            .filter(|s| s.visible && !s.disabled)
            .filter(|s| s.selected_value.trim().is_empty() || is_placeholder(&s.selected_text))
            .filter_map(|s| {
                let options: Vec<String> = s
                    .options
                    .iter()
                    .map(|o| collapse_whitespace(o))
                    .filter(|o| !is_placeholder(o))
                    .collect();
                if options.is_empty() {
                    return None;
                }
                Some(Dropdown {
                    label: first_label(&s.labels)?,
                    options,
                })
            })
            .collect();

        let radio_groups = raw
            .radio_groups
            .iter()
            .filter(|g| g.visible && !g.checked)
            .filter_map(|g| {
                Some(RadioGroup {
                    label: first_label(&g.labels)?,
                    options: self.option_labels(g),
                })
            })
            .collect();

        FormInventory {
            fields,
            radio_groups,
            dropdowns,
        }
    }

    /// 按策略链提取单选组的选项标签
    pub fn option_labels(&self, group: &RawRadioGroup) -> Vec<String> {
        for strategy in &self.strategies {
            if let Some(labels) = strategy.extract(group) {
                debug!("单选组 '{}' 选项来自策略 {}", group.name, strategy.name());
                return labels;
            }
        }
        Vec::new()
    }
}
