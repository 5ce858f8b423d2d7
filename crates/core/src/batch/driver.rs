//! Drives one job from acceptance to a terminal status.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use super::controller::ControllerInner;
use super::types::{BatchEvent, Notice};
use crate::engine::{EngineError, EngineLease};
use crate::format::{build_command, OutputFormat};
use crate::job::{Job, JobError, JobId, ResultHandle, ScratchNames};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};

/// What the driver needs from the job once it has started.
struct Plan {
    source_name: String,
    format: &'static OutputFormat,
    scratch: ScratchNames,
}

pub(super) async fn drive(ctx: Arc<ControllerInner>, id: JobId, data: Vec<u8>) {
    let plan = match ctx
        .update_job(&id, |job| {
            job.begin_upload()?;
            Ok(Plan {
                source_name: job.source_name.clone(),
                format: job.format,
                scratch: job.scratch.clone(),
            })
        })
        .await
    {
        Ok(plan) => plan,
        Err(JobError::NotFound(_)) => {
            debug!(job_id = %id, "Job removed before it started");
            return;
        }
        Err(e) => {
            warn!(job_id = %id, error = %e, "Job could not start");
            return;
        }
    };

    if let Err(e) = ctx.adapter.ensure_loaded().await {
        error!(job_id = %id, error = %e, "Engine unavailable");
        fail(
            &ctx,
            &id,
            &plan,
            e.to_string(),
            Notice::engine_load_failed(&plan.source_name),
        )
        .await;
        return;
    }
    ctx.announce_ready();

    if let Err(e) = ctx.update_job(&id, Job::begin_converting).await {
        debug!(job_id = %id, error = %e, "Job left the batch while the engine loaded");
        return;
    }

    // Subscribe before acquiring so no tick of our own command is missed
    let mut progress = ctx.adapter.subscribe_progress();
    let lease = match ctx.adapter.acquire(&id).await {
        Ok(lease) => lease,
        Err(e) => {
            fail(
                &ctx,
                &id,
                &plan,
                e.to_string(),
                Notice::conversion_failed(&plan.source_name),
            )
            .await;
            return;
        }
    };

    if !ctx.contains(&id).await {
        debug!(job_id = %id, "Job removed while waiting for the engine");
        return;
    }

    info!(job_id = %id, file = %plan.source_name, format = plan.format.id, "Converting");
    let started = Instant::now();
    let args = build_command(&plan.scratch.input, &plan.scratch.output, plan.format);

    let outcome = {
        let conversion = convert(&lease, &plan.scratch, &data, &args);
        tokio::pin!(conversion);
        loop {
            tokio::select! {
                result = &mut conversion => break result,
                tick = progress.recv() => match tick {
                    Ok(tick) if tick.job_id == id => apply_progress(&ctx, &id, tick.ratio).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(job_id = %id, skipped, "Progress receiver lagged");
                    }
                    Err(RecvError::Closed) => break (&mut conversion).await,
                },
            }
        }
    };

    cleanup(&lease, &plan.scratch).await;
    drop(lease);
    CONVERSION_DURATION
        .with_label_values(&[plan.format.id])
        .observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(bytes) => complete(&ctx, &id, &plan, bytes).await,
        Err(e) => {
            if let EngineError::ExecutionFailed {
                stderr: Some(stderr),
                ..
            } = &e
            {
                debug!(job_id = %id, stderr = %stderr, "Engine diagnostics");
            }
            error!(job_id = %id, file = %plan.source_name, error = %e, "Conversion failed");
            fail(
                &ctx,
                &id,
                &plan,
                e.to_string(),
                Notice::conversion_failed(&plan.source_name),
            )
            .await;
        }
    }
}

async fn convert(
    lease: &EngineLease,
    scratch: &ScratchNames,
    data: &[u8],
    args: &[String],
) -> Result<Vec<u8>, EngineError> {
    lease.write_input(&scratch.input, data).await?;
    lease.run(args).await?;
    lease.read_output(&scratch.output).await
}

/// Removes both scratch entries whatever the outcome.
async fn cleanup(lease: &EngineLease, scratch: &ScratchNames) {
    for name in [&scratch.input, &scratch.output] {
        if let Err(e) = lease.remove_file(name).await {
            warn!(job_id = %lease.job_id(), file = %name, error = %e, "Failed to remove scratch file");
        }
    }
}

async fn apply_progress(ctx: &ControllerInner, id: &JobId, ratio: f64) {
    let mut registry = ctx.registry.write().await;
    let Some(job) = registry.get_mut(id) else {
        return;
    };
    if let Ok(true) = job.record_progress(ratio) {
        debug!(job_id = %id, progress = job.progress, "Progress");
        ctx.emit(BatchEvent::JobUpdated {
            job: job.snapshot(),
        });
    }
}

async fn complete(ctx: &ControllerInner, id: &JobId, plan: &Plan, bytes: Vec<u8>) {
    let mut registry = ctx.registry.write().await;
    let Some(job) = registry.get_mut(id) else {
        info!(job_id = %id, "Job removed during conversion, discarding output");
        CONVERSIONS_TOTAL
            .with_label_values(&["discarded", plan.format.id])
            .inc();
        return;
    };

    let size_bytes = bytes.len() as u64;
    let blob = ctx
        .outputs
        .insert(bytes, job.output_name.clone(), plan.format.mime_type);
    let handle = ResultHandle {
        blob,
        output_name: job.output_name.clone(),
        mime_type: plan.format.mime_type.to_string(),
        size_bytes,
    };

    match job.complete(handle) {
        Ok(()) => {
            info!(job_id = %id, output = %job.output_name, size_bytes, "Conversion completed");
            CONVERSIONS_TOTAL
                .with_label_values(&["success", plan.format.id])
                .inc();
            ctx.emit(BatchEvent::JobUpdated {
                job: job.snapshot(),
            });
            ctx.notify(
                Notice::conversion_completed(&plan.source_name, plan.format.display_label)
                    .for_job(id),
            );
        }
        Err(e) => {
            error!(job_id = %id, error = %e, "Could not record result");
            ctx.outputs.release(blob);
        }
    }
}

async fn fail(ctx: &ControllerInner, id: &JobId, plan: &Plan, reason: String, notice: Notice) {
    match ctx.update_job(id, |job| job.fail(reason)).await {
        Ok(()) => {
            CONVERSIONS_TOTAL
                .with_label_values(&["failed", plan.format.id])
                .inc();
            ctx.notify(notice.for_job(id));
        }
        Err(JobError::NotFound(_)) => {
            debug!(job_id = %id, "Job removed before its failure was recorded");
            CONVERSIONS_TOTAL
                .with_label_values(&["discarded", plan.format.id])
                .inc();
        }
        Err(e) => warn!(job_id = %id, error = %e, "Could not record failure"),
    }
}
