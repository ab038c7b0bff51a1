//! 页面动作服务 - 业务能力层
//!
//! 每个动作都是幂等的页面脚本，返回是否命中目标：
//! 找不到目标元素不是错误，只返回 `Ok(false)`；只有 CDP 通信失败才是 `Err`

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::infrastructure::JsExecutor;
use crate::models::FormAnswers;
use crate::services::form_inspector::FIND_CONTAINER_JS;

/// 标签匹配相关的 JS 辅助函数
const LABEL_HELPERS_JS: &str = r#"
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase().replace(/\s*required$/, '').replace(/\*$/, '').trim();
    const textOf = (el) => (el ? (el.innerText || el.textContent || '') : '');
    const labelsOf = (el, root) => {
        const out = [];
        if (el.id) {
            const l = root.querySelector(`label[for="${CSS.escape(el.id)}"]`);
            if (l) out.push(textOf(l));
        }
        const wrap = el.closest('label');
        if (wrap) out.push(textOf(wrap));
        if (el.getAttribute('aria-label')) out.push(el.getAttribute('aria-label'));
        const group = el.closest('.fb-dash-form-element, .jobs-easy-apply-form-element, .form-group, fieldset, div');
        if (group) {
            const l = group.querySelector('label, legend, .fb-dash-form-element__label');
            if (l) out.push(textOf(l));
        }
        if (el.placeholder) out.push(el.placeholder);
        if (el.name) out.push(el.name);
        return out.map(norm).filter((s) => s.length > 0);
    };
    const labelMatches = (el, root, wanted) => {
        const target = norm(wanted);
        return labelsOf(el, root).some((l) => l === target || l.startsWith(target) || l === target + ' ' + target);
    };
    const fire = (el) => {
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
        el.dispatchEvent(new Event('blur', { bubbles: true }));
    };
"#;

/// 容器快照的浏览器侧部分
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerProbe {
    pub text: String,
    pub has_prefilled_email: bool,
}

/// 页面动作执行器
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn run_bool(&self, executor: &JsExecutor, body: &str, what: &str) -> Result<bool> {
        let js_code = format!(
            "(() => {{ {} {} {} }})()",
            FIND_CONTAINER_JS, LABEL_HELPERS_JS, body
        );
        let hit = executor
            .eval_bool(js_code)
            .await
            .with_context(|| format!("执行页面动作失败: {}", what))?;
        debug!("{} -> {}", what, hit);
        Ok(hit)
    }

    /// 填写文本输入框
    pub async fn fill_field(&self, executor: &JsExecutor, label: &str, value: &str) -> Result<bool> {
        let body = format!(
            r#"
            const root = findContainer();
            const wanted = {label};
            const value = {value};
            const el = Array.from(root.querySelectorAll('input, textarea'))
                .filter((e) => !['radio', 'checkbox', 'hidden', 'file', 'submit', 'button'].includes((e.type || '').toLowerCase()))
                .find((e) => labelMatches(e, root, wanted));
            if (!el) return false;
            const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
            const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
            el.focus();
            setter.call(el, value);
            fire(el);
            return true;
            "#,
            label = serde_json::to_string(label)?,
            value = serde_json::to_string(value)?,
        );
        self.run_bool(executor, &body, &format!("填写 '{}'", label)).await
    }

    /// 选中单选组中的选项
    ///
    /// 先按选项标签文本匹配；是非题再按 value 属性兜底
    pub async fn check_radio(&self, executor: &JsExecutor, group_label: &str, option: &str) -> Result<bool> {
        let body = format!(
            r#"
            const root = findContainer();
            const wanted = norm({group});
            const option = norm({option});
            const groups = new Map();
            Array.from(root.querySelectorAll('input[type="radio"]')).forEach((r) => {{
                const key = r.name || r.id;
                if (!groups.has(key)) groups.set(key, []);
                groups.get(key).push(r);
            }});
            for (const radios of groups.values()) {{
                const fieldset = radios[0].closest('fieldset') || radios[0].parentElement;
                const heading = fieldset ? norm(textOf(fieldset.querySelector('legend, .fb-dash-form-element__label, span[data-test-form-builder-radio-button-form-component__title]'))) : '';
                const names = [heading, norm(fieldset && fieldset.getAttribute('aria-label')), norm(radios[0].name)];
                if (!names.some((n) => n && (n === wanted || n.startsWith(wanted) || n === wanted + ' ' + wanted))) continue;

                const optionText = (r) => {{
                    const l = r.id ? root.querySelector(`label[for="${{CSS.escape(r.id)}}"]`) : null;
                    return norm(textOf(l) || textOf(r.parentElement));
                }};
                let target = radios.find((r) => optionText(r) === option)
                    || radios.find((r) => optionText(r).includes(option));
                if (!target && (option === 'yes' || option === 'no')) {{
                    const truthy = ['yes', 'true', '1', 'y'];
                    target = radios.find((r) => truthy.includes(norm(r.value)) === (option === 'yes'));
                }}
                if (!target) return false;
                const clickable = (target.id && root.querySelector(`label[for="${{CSS.escape(target.id)}}"]`)) || target;
                clickable.click();
                if (!target.checked) {{ target.checked = true; fire(target); }}
                return true;
            }}
            return false;
            "#,
            group = serde_json::to_string(group_label)?,
            option = serde_json::to_string(option)?,
        );
        self.run_bool(executor, &body, &format!("单选 '{}' = '{}'", group_label, option))
            .await
    }

    /// 在下拉框中选择选项（按可见文本子串匹配）
    pub async fn select_option(&self, executor: &JsExecutor, label: &str, option: &str) -> Result<bool> {
        let body = format!(
            r#"
            const root = findContainer();
            const wanted = {label};
            const option = norm({option});
            const el = Array.from(root.querySelectorAll('select')).find((s) => labelMatches(s, root, wanted));
            if (!el) return false;
            const opts = Array.from(el.options);
            const idx = [
                opts.findIndex((o) => norm(textOf(o)) === option),
                opts.findIndex((o) => norm(textOf(o)).includes(option)),
            ].find((i) => i >= 0);
            if (idx === undefined) return false;
            el.selectedIndex = idx;
            fire(el);
            return true;
            "#,
            label = serde_json::to_string(label)?,
            option = serde_json::to_string(option)?,
        );
        self.run_bool(executor, &body, &format!("下拉 '{}' = '{}'", label, option))
            .await
    }

    /// 点击 "下一步 / 继续 / 检查" 按钮
    ///
    /// 优先使用明确的主操作按钮，其次按文本匹配；永远不会点击提交按钮
    pub async fn click_next(&self, executor: &JsExecutor) -> Result<bool> {
        let body = r#"
            const root = findContainer();
            const buttons = Array.from(root.querySelectorAll('button')).filter((b) => !b.disabled);
            const isSubmit = (b) => /submit/.test(norm(textOf(b) + ' ' + (b.getAttribute('aria-label') || '')));
            const explicit = buttons.find((b) => {
                const aria = norm(b.getAttribute('aria-label'));
                return aria.includes('continue to next step') || aria.includes('review your application')
                    || b.hasAttribute('data-easy-apply-next-button') || b.hasAttribute('data-live-test-easy-apply-next-button')
                    || b.hasAttribute('data-live-test-easy-apply-review-button');
            });
            const primary = buttons.find((b) => b.classList.contains('artdeco-button--primary') && !isSubmit(b));
            const byText = buttons.find((b) => {
                const t = norm(textOf(b));
                return t === 'next' || t === 'continue' || t === 'review' || t.startsWith('continue') || t.startsWith('next');
            });
            const target = explicit || primary || byText;
            if (!target || isSubmit(target)) return false;
            target.click();
            return true;
        "#;
        self.run_bool(executor, body, "点击下一步").await
    }

    /// 点击 "提交申请" 按钮
    pub async fn click_submit(&self, executor: &JsExecutor) -> Result<bool> {
        let body = r#"
            const root = findContainer();
            const buttons = Array.from(root.querySelectorAll('button')).filter((b) => !b.disabled);
            const target = buttons.find((b) => norm(b.getAttribute('aria-label')).includes('submit application'))
                || buttons.find((b) => b.hasAttribute('data-live-test-easy-apply-submit-button'))
                || buttons.find((b) => norm(textOf(b)).startsWith('submit'));
            if (!target) return false;
            target.click();
            return true;
        "#;
        self.run_bool(executor, body, "点击提交").await
    }

    /// 打开 Easy Apply 弹窗
    pub async fn open_easy_apply(&self, executor: &JsExecutor) -> Result<bool> {
        let body = r#"
            const candidates = Array.from(document.querySelectorAll('button, a'))
                .filter((b) => !b.disabled)
                .filter((b) => /easy apply/.test(norm(textOf(b) + ' ' + (b.getAttribute('aria-label') || ''))));
            const target = candidates.find((b) => b.classList.contains('jobs-apply-button')) || candidates[0];
            if (!target) return false;
            target.click();
            return true;
        "#;
        self.run_bool(executor, body, "打开 Easy Apply").await
    }

    /// 职位页面上是否已有 "已申请" 标记
    pub async fn already_applied(&self, executor: &JsExecutor) -> Result<bool> {
        let body = r#"
            const feedback = Array.from(document.querySelectorAll('.artdeco-inline-feedback__message, .post-apply-timeline__entity, .jobs-s-apply'))
                .map((el) => norm(textOf(el)));
            if (feedback.some((t) => /^applied\b/.test(t) || t.includes('application submitted'))) return true;
            const text = norm(document.body ? document.body.innerText : '');
            return /applied \d+ (second|minute|hour|day|week|month)s? ago/.test(text) || text.includes('you applied on');
        "#;
        self.run_bool(executor, body, "检查已申请标记").await
    }

    /// 页面上是否出现任意成功短语
    pub async fn has_success_signal(&self, executor: &JsExecutor, phrases: &[String]) -> Result<bool> {
        let body = format!(
            r#"
            const phrases = {phrases};
            const root = findContainer();
            const text = norm(textOf(root) + ' ' + textOf(document.querySelector('.artdeco-toast-item, [role="alert"]')));
            return phrases.some((p) => p && text.includes(p.toLowerCase()));
            "#,
            phrases = serde_json::to_string(phrases)?,
        );
        self.run_bool(executor, &body, "检查成功标记").await
    }

    /// 读取申请容器的文本和邮箱预填状态
    pub async fn snapshot_container(&self, executor: &JsExecutor) -> Result<ContainerProbe> {
        let js_code = format!(
            r#"(() => {{
                {}
                const root = findContainer();
                const emailInputs = Array.from(root.querySelectorAll('input[type="email"], input[name*="email" i], input[id*="email" i]'));
                const emailSelects = Array.from(root.querySelectorAll('select'))
                    .filter((s) => /email/i.test(s.id + ' ' + s.name + ' ' + (s.getAttribute('aria-label') || '')) || /@/.test(s.value || ''));
                return {{
                    text: (root.innerText || root.textContent || '').slice(0, 20000),
                    hasPrefilledEmail: emailInputs.some((e) => (e.value || '').includes('@'))
                        || emailSelects.some((s) => (s.value || '').includes('@')),
                }};
            }})()"#,
            FIND_CONTAINER_JS
        );
        executor
            .eval_as(js_code)
            .await
            .context("读取申请容器快照失败")
    }

    /// 应用一组答案，返回成功落地的数量
    pub async fn apply_answers(&self, executor: &JsExecutor, answers: &FormAnswers) -> Result<usize> {
        let mut landed = 0;

        for answer in &answers.fields {
            if answer.value.is_empty() {
                continue;
            }
            if self.fill_field(executor, &answer.label, &answer.value).await? {
                landed += 1;
            } else {
                warn!("未找到输入框 '{}'", answer.label);
            }
        }

        for answer in &answers.radio_groups {
            if self.check_radio(executor, &answer.label, &answer.value).await? {
                landed += 1;
            } else {
                warn!("未找到单选项 '{}' = '{}'", answer.label, answer.value);
            }
        }

        for answer in &answers.dropdowns {
            if self.select_option(executor, &answer.label, &answer.value).await? {
                landed += 1;
            } else {
                warn!("未找到下拉选项 '{}' = '{}'", answer.label, answer.value);
            }
        }

        Ok(landed)
    }
}
