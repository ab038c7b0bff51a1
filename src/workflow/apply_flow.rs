//! 申请流程 - 流程层
//!
//! 核心职责：定义"申请一个职位"的完整流程
//!
//! 流程顺序：
//! 1. 启动浏览器 → 打开职位页面（停在登录墙上直接失败）
//! 2. 检查"已申请"标记 → 打开 Easy Apply 弹窗
//! 3. 有限次循环：检查成功 → 识别页面状态 → 执行对应动作 → 再次检查成功
//! 4. 无论结果如何都释放浏览器会话

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{ApplicantProfile, PageState};
use crate::services::{AnswerResolver, PageClassifier};
use crate::utils::truncate_text;
use crate::workflow::apply_ctx::ApplyCtx;
use crate::workflow::progress::{ProgressEvent, ProgressSink};
use crate::workflow::session::ApplySession;

pub const REASON_ALREADY_APPLIED: &str = "Already applied";
pub const REASON_NO_EASY_APPLY: &str = "Easy Apply button not found";

/// 申请结果
///
/// - 成功：`{success: true}`
/// - 主动跳过：`{success: false, reason}`
/// - 出错：`{success: false, error}`
/// - 迭代次数用尽：`{success: false}`，不带任何说明
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn skipped(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn gave_up() -> Self {
        Self::default()
    }
}

/// 申请流程
///
/// - 编排完整的申请流程
/// - 决定何时前进、何时回答、何时提交
/// - 不持有浏览器资源（通过 ApplySession 操作）
pub struct ApplyFlow {
    resolver: AnswerResolver,
    classifier: PageClassifier,
    max_iterations: usize,
}

impl ApplyFlow {
    /// 创建新的申请流程
    pub fn new(config: &Config) -> Self {
        Self {
            resolver: AnswerResolver::from_config(config),
            classifier: PageClassifier::default(),
            max_iterations: config.apply_max_iterations,
        }
    }

    pub fn with_parts(
        resolver: AnswerResolver,
        classifier: PageClassifier,
        max_iterations: usize,
    ) -> Self {
        Self {
            resolver,
            classifier,
            max_iterations,
        }
    }

    pub fn classifier(&self) -> &PageClassifier {
        &self.classifier
    }

    /// 执行一次完整的申请
    ///
    /// 会话在返回前一定会被关闭，且只关闭一次
    pub async fn run<S: ApplySession + ?Sized>(
        &self,
        session: &mut S,
        job_url: &str,
        profile: &ApplicantProfile,
        progress: &ProgressSink,
    ) -> ApplyOutcome {
        let mut ctx = ApplyCtx::new(job_url);
        info!("{} 🚀 开始申请: {}", ctx, job_url);

        let outcome = match self.drive(session, &mut ctx, profile, progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} ❌ 申请失败: {:#}", ctx, e);
                progress.emit(ProgressEvent::Error {
                    message: e.to_string(),
                });
                ApplyOutcome::failed(e.to_string())
            }
        };

        progress.emit(ProgressEvent::Closing);
        session.close().await;

        match (&outcome.reason, outcome.success) {
            (_, true) => info!("{} 🎉 申请成功", ctx),
            (Some(reason), false) => info!("{} ⏭️ 跳过: {}", ctx, reason),
            (None, false) if outcome.error.is_none() => {
                warn!("{} ⚠️ 达到最大迭代次数 {}，放弃", ctx, self.max_iterations)
            }
            _ => {}
        }
        outcome
    }

    async fn drive<S: ApplySession + ?Sized>(
        &self,
        session: &mut S,
        ctx: &mut ApplyCtx,
        profile: &ApplicantProfile,
        progress: &ProgressSink,
    ) -> Result<ApplyOutcome> {
        session.start().await?;
        progress.emit(ProgressEvent::BrowserReady);

        let page = session.navigate(&ctx.job_url).await?;
        page.ensure_signed_in()?;
        progress.emit(ProgressEvent::Navigated {
            url: ctx.job_url.clone(),
        });

        if session.already_applied().await? {
            return Ok(ApplyOutcome::skipped(REASON_ALREADY_APPLIED));
        }

        if !session.open_apply_modal().await? {
            return Ok(ApplyOutcome::skipped(REASON_NO_EASY_APPLY));
        }
        progress.emit(ProgressEvent::ModalOpened);
        info!("{} ✓ 申请弹窗已打开", ctx);

        for iteration in 1..=self.max_iterations {
            ctx.iteration = iteration;
            ctx.state = None;

            if session.has_success_signal().await? {
                progress.emit(ProgressEvent::Success);
                return Ok(ApplyOutcome::succeeded());
            }

            let snapshot = session.snapshot().await?;
            let state = self.classifier.classify(&snapshot);
            ctx.state = Some(state);
            progress.emit(ProgressEvent::PageClassified { iteration, state });
            info!("{} 📄 页面识别完成", ctx);

            let acted = match state {
                PageState::Success => {
                    progress.emit(ProgressEvent::Success);
                    return Ok(ApplyOutcome::succeeded());
                }
                PageState::ContactInfo | PageState::Resume | PageState::TopChoice => {
                    session.advance().await?
                }
                PageState::AdditionalQuestions => {
                    let resolved = self.resolver.resolve(&snapshot.inventory, profile).await;
                    progress.emit(ProgressEvent::Answering {
                        iteration,
                        count: resolved.answers.len(),
                        source: resolved.source,
                    });
                    let landed = session.apply_answers(&resolved.answers).await?;
                    info!(
                        "{} ✍️ 填写 {}/{} 个答案（来源: {:?}）",
                        ctx,
                        landed,
                        snapshot.inventory.len(),
                        resolved.source
                    );
                    session.advance().await?
                }
                PageState::Review => {
                    progress.emit(ProgressEvent::Submitting { iteration });
                    info!("{} 📨 提交申请", ctx);
                    if session.submit().await? {
                        true
                    } else {
                        session.advance().await?
                    }
                }
                PageState::Unknown => {
                    warn!(
                        "{} ❓ 无法识别的页面，尝试前进。容器文本: {}",
                        ctx,
                        truncate_text(&snapshot.text, 300)
                    );
                    session.advance().await?
                }
            };

            if !acted {
                warn!("{} ⚠️ 本轮动作未命中目标元素", ctx);
            }

            // 有些页面点击"继续"后会直接静默提交
            if session.has_success_signal().await? {
                progress.emit(ProgressEvent::Success);
                return Ok(ApplyOutcome::succeeded());
            }
        }

        Ok(ApplyOutcome::gave_up())
    }
}
