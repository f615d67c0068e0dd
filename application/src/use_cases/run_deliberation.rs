//! Run Deliberation use case
//!
//! Drives the full three-stage pipeline: fan out the competing agents,
//! have a judge panel rank the anonymized survivors, and ask the chairman
//! for a synthesis. Each stage gate degrades instead of crashing: the
//! pipeline always returns the best available partial result plus a note
//! explaining what was skipped.

use crate::ports::agent_provider::{ExecutionContext, ProviderRegistry};
use crate::ports::model_gateway::ModelGateway;
use crate::ports::pricing::PricingSource;
use crate::ports::progress::DeliberationProgress;
use crate::ports::run_store::RunStore;
use crate::run_controller::RunController;
use chrono::Utc;
use council_domain::{
    AgentConfig, AgentResult, AgentStatus, AggregateRanking, ConfigIssueCode, DeliberationRun,
    DomainError, JudgeResult, PromptTemplate, Stage, Stage1Result, SynthesisOutcome,
    aggregate_rankings, assign_labels, parse_ranking, validate_agents,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Flush interval for judge verdict chunks: batches callback volume
/// without losing the real-time feel.
const CHUNK_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Errors that abort a deliberation run outright. Per-agent and per-judge
/// failures never surface here; they are contained and reported as data.
#[derive(Error, Debug)]
pub enum RunDeliberationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Input for one deliberation run.
#[derive(Debug, Clone)]
pub struct RunDeliberationInput {
    /// The user's task, given verbatim to every competitor.
    pub prompt: String,
    /// All configured agents; disabled ones are skipped at dispatch.
    pub agents: Vec<AgentConfig>,
    /// Judge panel model ids. Empty panel skips the judge stage.
    pub judge_models: Vec<String>,
    /// Chairman model for the synthesis stage.
    pub chairman_model: String,
    /// Optional image attachments for backends that accept them.
    pub images: Vec<PathBuf>,
    /// Judge chunk batching interval; tests shorten it.
    pub chunk_flush: Duration,
}

impl RunDeliberationInput {
    pub fn new(prompt: impl Into<String>, agents: Vec<AgentConfig>) -> Self {
        Self {
            prompt: prompt.into(),
            agents,
            judge_models: Vec::new(),
            chairman_model: String::new(),
            images: Vec::new(),
            chunk_flush: CHUNK_FLUSH_INTERVAL,
        }
    }

    pub fn with_judges(mut self, judge_models: Vec<String>, chairman_model: impl Into<String>) -> Self {
        self.judge_models = judge_models;
        self.chairman_model = chairman_model.into();
        self
    }
}

/// Use case for running one deliberation.
pub struct RunDeliberationUseCase {
    registry: Arc<ProviderRegistry>,
    gateway: Arc<dyn ModelGateway>,
    pricing: Arc<dyn PricingSource>,
    store: Arc<dyn RunStore>,
}

impl RunDeliberationUseCase {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        gateway: Arc<dyn ModelGateway>,
        pricing: Arc<dyn PricingSource>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            registry,
            gateway,
            pricing,
            store,
        }
    }

    /// Execute the pipeline. The caller owns the controller and may cancel
    /// the run (or single agents) from another task at any point.
    pub async fn execute(
        &self,
        input: RunDeliberationInput,
        progress: Arc<dyn DeliberationProgress>,
        controller: Arc<RunController>,
    ) -> Result<DeliberationRun, RunDeliberationError> {
        let started_at = Utc::now();
        let enabled: Vec<AgentConfig> = input.agents.iter().filter(|a| a.enabled).cloned().collect();
        if enabled.is_empty() {
            return Err(DomainError::NoAgents.into());
        }
        for issue in validate_agents(&input.agents) {
            if issue.code == ConfigIssueCode::DuplicateAgentKey {
                return Err(DomainError::InvalidAgentConfig(issue.message).into());
            }
        }

        info!(agents = enabled.len(), "starting deliberation");
        let mut notes = Vec::new();

        // Stage 1: compete
        let results = self
            .stage_compete(&input, &enabled, &progress, &controller)
            .await;

        let stage1: Vec<Stage1Result> = results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| Stage1Result::new(r.name.clone(), r.normalized_plan.clone()))
            .collect();

        // Gate: nothing to judge
        if stage1.is_empty() {
            notes.push("all agents failed; no responses to judge".to_string());
            self.seal_run(&input, started_at, results, stage1, vec![], vec![], None, notes);
            return Err(DomainError::NoResponses.into());
        }

        // Gate: a single response cannot be ranked
        if stage1.len() < 2 {
            debug!("skipping judge stage: single successful response");
            notes.push(
                "only one successful response; judging skipped (insufficient data to rank)"
                    .to_string(),
            );
            let synthesis =
                SynthesisOutcome::new(stage1[0].model.clone(), stage1[0].response.clone());
            let run = self.seal_run(
                &input, started_at, results, stage1, vec![], vec![], Some(synthesis), notes,
            );
            return Ok(run);
        }

        // Stage 2: judge
        let labels = assign_labels(stage1.len());
        let labeled: Vec<(String, String)> = labels
            .iter()
            .cloned()
            .zip(stage1.iter().map(|r| r.response.clone()))
            .collect();
        let label_models: Vec<(String, String)> = labels
            .iter()
            .cloned()
            .zip(stage1.iter().map(|r| r.model.clone()))
            .collect();

        let judges = if input.judge_models.is_empty() {
            notes.push("no judge models configured; judging skipped".to_string());
            Vec::new()
        } else {
            let judges = self.stage_judge(&input, &labeled, &progress).await;
            if judges.len() < input.judge_models.len() {
                notes.push(format!(
                    "{} of {} judges responded",
                    judges.len(),
                    input.judge_models.len()
                ));
            }
            judges
        };

        // Gate: no usable verdicts, fall back to the first response
        if judges.is_empty() {
            notes.push(
                "no judge produced a usable response; synthesis skipped, returning the first response"
                    .to_string(),
            );
            let synthesis =
                SynthesisOutcome::new(stage1[0].model.clone(), stage1[0].response.clone());
            let run = self.seal_run(
                &input, started_at, results, stage1, vec![], vec![], Some(synthesis), notes,
            );
            return Ok(run);
        }

        let rankings: Vec<Vec<String>> =
            judges.iter().map(|j| j.parsed_ranking.clone()).collect();
        let aggregate = aggregate_rankings(&label_models, &rankings);

        // Stage 3: synthesize
        let synthesis = self
            .stage_synthesize(&input, &labeled, &judges, &progress, &mut notes)
            .await;

        let run = self.seal_run(
            &input, started_at, results, stage1, judges, aggregate, Some(synthesis), notes,
        );
        Ok(run)
    }

    /// Stage 1: fan out one execution per enabled agent, all concurrent,
    /// and wait for every one to settle. A hung sibling never blocks
    /// collection of the others; an individual failure is data, not an
    /// error.
    async fn stage_compete(
        &self,
        input: &RunDeliberationInput,
        enabled: &[AgentConfig],
        progress: &Arc<dyn DeliberationProgress>,
        controller: &Arc<RunController>,
    ) -> Vec<AgentResult> {
        progress.on_stage_change(
            Stage::Compete,
            &format!("{} agents competing", enabled.len()),
        );

        // Dispatch order: every agent key is announced as queued before any
        // execution task is spawned, so callers always learn an agent's
        // identity before its first stream event arrives.
        for config in enabled {
            progress.on_agent_status(&config.agent_key(), AgentStatus::Queued);
        }

        let prompt = PromptTemplate::competitor_prompt(&input.prompt);
        let mut join_set = JoinSet::new();

        for (idx, config) in enabled.iter().cloned().enumerate() {
            let provider = self.registry.get(config.id);
            let controller = Arc::clone(controller);
            let progress = Arc::clone(progress);
            let prompt = prompt.clone();
            let images = input.images.clone();

            join_set.spawn(async move {
                let result = match provider {
                    Some(provider) => {
                        let ctx =
                            ExecutionContext::new(controller, progress).with_images(images);
                        provider.execute(&config, &prompt, ctx).await
                    }
                    None => {
                        let mut result = AgentResult::queued(&config);
                        result.push_error(format!(
                            "no provider registered for kind '{}'",
                            config.id
                        ));
                        result.finish(AgentStatus::Error);
                        result
                    }
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<AgentResult>> = enabled.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, result)) => {
                    progress.on_agent_status(&result.agent_key, result.status);
                    slots[idx] = Some(result);
                }
                Err(e) => warn!("agent task join error: {e}"),
            }
        }
        let mut results: Vec<AgentResult> = slots.into_iter().flatten().collect();

        // Price agent usage when the backend itself did not report a cost
        for result in &mut results {
            if result.usage.total_cost.is_none() && !result.usage.is_empty() {
                result.usage.total_cost = self
                    .pricing
                    .lookup(&result.model)
                    .map(|p| p.estimate(&result.usage));
            }
        }
        results
    }

    /// Stage 2: send the same ranking prompt to every judge concurrently.
    /// A failed judge contributes nothing; the survivors' verdicts are
    /// returned in panel order.
    async fn stage_judge(
        &self,
        input: &RunDeliberationInput,
        labeled: &[(String, String)],
        progress: &Arc<dyn DeliberationProgress>,
    ) -> Vec<JudgeResult> {
        progress.on_stage_change(
            Stage::Judge,
            &format!(
                "{} judges ranking {} responses",
                input.judge_models.len(),
                labeled.len()
            ),
        );

        let prompt = PromptTemplate::ranking_prompt(&input.prompt, labeled);
        let mut join_set = JoinSet::new();

        for (idx, model) in input.judge_models.iter().cloned().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let pricing = Arc::clone(&self.pricing);
            let progress = Arc::clone(progress);
            let prompt = prompt.clone();
            let flush = input.chunk_flush;

            join_set.spawn(async move {
                let judge = judge_one(gateway, pricing, progress, model, prompt, flush).await;
                (idx, judge)
            });
        }

        let mut slots: Vec<Option<JudgeResult>> =
            input.judge_models.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, judge)) => slots[idx] = judge,
                Err(e) => warn!("judge task join error: {e}"),
            }
        }
        slots.into_iter().flatten().collect()
    }

    /// Stage 3: one chairman call. A failure here, after two stages of
    /// real work, produces a placeholder answer and a note rather than an
    /// error.
    async fn stage_synthesize(
        &self,
        input: &RunDeliberationInput,
        labeled: &[(String, String)],
        judges: &[JudgeResult],
        progress: &Arc<dyn DeliberationProgress>,
        notes: &mut Vec<String>,
    ) -> SynthesisOutcome {
        progress.on_stage_change(Stage::Synthesize, "chairman synthesizing final answer");
        progress.on_synthesis_start();

        let verdicts: Vec<(String, String)> = judges
            .iter()
            .map(|j| (j.model.clone(), j.ranking_text.clone()))
            .collect();
        let prompt = PromptTemplate::synthesis_prompt(&input.prompt, labeled, &verdicts);

        match self.gateway.complete(&input.chairman_model, &prompt).await {
            Ok(reply) => {
                let mut outcome = SynthesisOutcome::new(&input.chairman_model, reply.text);
                if let Some(usage) = reply.usage {
                    let cost = usage.total_cost.or_else(|| {
                        self.pricing
                            .lookup(&input.chairman_model)
                            .map(|p| p.estimate(&usage))
                    });
                    outcome = outcome.with_usage(usage, cost);
                }
                outcome
            }
            Err(e) => {
                warn!("synthesis failed: {e}");
                notes.push(format!("synthesis failed: {e}"));
                SynthesisOutcome::new(&input.chairman_model, format!("Synthesis failed: {e}"))
            }
        }
    }

    /// Assemble the run record and emit it to the run store.
    #[allow(clippy::too_many_arguments)]
    fn seal_run(
        &self,
        input: &RunDeliberationInput,
        started_at: chrono::DateTime<Utc>,
        results: Vec<AgentResult>,
        stage1: Vec<Stage1Result>,
        judges: Vec<JudgeResult>,
        aggregate: Vec<AggregateRanking>,
        synthesis: Option<SynthesisOutcome>,
        notes: Vec<String>,
    ) -> DeliberationRun {
        let run = DeliberationRun {
            prompt: input.prompt.clone(),
            started_at,
            ended_at: Utc::now(),
            agents: input.agents.clone(),
            results,
            stage1,
            judges,
            aggregate,
            synthesis,
            notes,
        };
        self.store.record(&run);
        run
    }
}

/// Run one judge: stream the verdict (batched through `flush`-interval
/// ticks), parse the ranking, and price the call. Network failures are
/// contained here and reported as `None`.
async fn judge_one(
    gateway: Arc<dyn ModelGateway>,
    pricing: Arc<dyn PricingSource>,
    progress: Arc<dyn DeliberationProgress>,
    model: String,
    prompt: String,
    flush: Duration,
) -> Option<JudgeResult> {
    progress.on_ranking_model_start(&model);
    let started_at = Utc::now();

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let batcher = tokio::spawn(batch_chunks(rx, model.clone(), Arc::clone(&progress), flush));

    let result = {
        // Moving tx into the closure means dropping the closure closes the
        // channel, which ends the batcher after a final flush.
        let on_chunk = move |chunk: &str| {
            let _ = tx.send(chunk.to_string());
        };
        gateway.complete_streaming(&model, &prompt, &on_chunk).await
    };
    let _ = batcher.await;

    match result {
        Ok(reply) => {
            progress.on_ranking_model_complete(&model, true);
            let parsed = parse_ranking(&reply.text);
            if parsed.is_empty() {
                debug!(model, "judge verdict contained no parseable ranking");
            }
            let estimated_cost = reply.usage.as_ref().and_then(|usage| {
                usage
                    .total_cost
                    .or_else(|| pricing.lookup(&model).map(|p| p.estimate(usage)))
            });
            Some(JudgeResult {
                model,
                ranking_text: reply.text,
                parsed_ranking: parsed,
                usage: reply.usage,
                started_at,
                ended_at: Utc::now(),
                estimated_cost,
            })
        }
        Err(e) => {
            warn!(model, "judge call failed: {e}");
            progress.on_ranking_model_complete(&model, false);
            None
        }
    }
}

/// Forward judge chunks to the progress callback, coalesced per tick.
async fn batch_chunks(
    mut rx: mpsc::UnboundedReceiver<String>,
    model: String,
    progress: Arc<dyn DeliberationProgress>,
    flush: Duration,
) {
    let mut interval = tokio::time::interval(flush);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut buffer = String::new();

    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(chunk) => buffer.push_str(&chunk),
                None => break,
            },
            _ = interval.tick() => {
                if !buffer.is_empty() {
                    progress.on_ranking_model_chunk(&model, &buffer);
                    buffer.clear();
                }
            }
        }
    }
    if !buffer.is_empty() {
        progress.on_ranking_model_chunk(&model, &buffer);
    }
}
