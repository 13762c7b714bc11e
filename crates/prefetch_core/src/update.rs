use prefetch_logging::{prefetch_debug, prefetch_info, prefetch_trace, prefetch_warn};

use crate::state::WorkerSlot;
use crate::{
    CorrelationId, Effect, FetchOutcome, FetchReport, Frequency, Msg, Notification, Phase,
    PoolState, Query, QueryKind, Ticket, WorkerId,
};

/// Pure update function: applies a message to the pool and returns any effects.
pub fn update(mut state: PoolState, msg: Msg) -> (PoolState, Vec<Effect>) {
    let mut effects = Vec::new();
    let fx = &mut effects;

    match msg {
        Msg::PrefetchQueued(query) => state.prefetch_queued(query),
        Msg::PrefetchImmediately(query) => {
            state.prefetch_immediately(query, fx);
        }
        Msg::Request(query) => state.request(query, fx),
        Msg::DelayRequest(query) => state.delay_request(query, fx),
        Msg::DiscardByCorrelationId(id) => state.discard(id, fx),
        Msg::ForceStopActive => {
            if let Some(id) = state.active {
                state.stop_worker(id, fx);
            }
        }
        Msg::Reset => state.reset(fx),
        Msg::ApplySettings(settings) => {
            prefetch_info!(
                "Query settings changed: directory={} translate={}->{}",
                settings.dictionary_directory,
                settings.translate_from,
                settings.translate_to
            );
            state.config.query = settings;
        }
        Msg::PrefetchTick => state.issue_prefetch(fx),
        Msg::DebounceElapsed { generation } => state.debounce_elapsed(generation, fx),
        Msg::FetchProgress {
            worker,
            ticket,
            percent,
        } => state.apply_progress(worker, ticket, percent, fx),
        Msg::FetchTimedOut { worker, ticket } => {
            if state.live_slot(worker, ticket).map(|w| w.phase) == Some(Phase::Working) {
                prefetch_info!("Worker {} timed out; stopping", worker);
                state.time_out_worker(worker, fx);
            }
        }
        Msg::FetchFinished {
            worker,
            ticket,
            report,
        } => state.apply_finished(worker, ticket, report, fx),
    }

    state.report_usage(fx);
    (state, effects)
}

impl PoolState {
    fn prefetch_queued(&mut self, query: Query) {
        if self.worker_holding(&query).is_some() || self.backlog.contains(&query) {
            prefetch_trace!("Not queueing {}; already held or queued", query);
            return;
        }
        self.backlog.push_back(query);
    }

    pub(crate) fn prefetch_immediately(&mut self, query: Query, fx: &mut Vec<Effect>) -> WorkerId {
        if let Some(id) = self.worker_holding(&query) {
            return id;
        }
        // Started now, so the backlog copy would only be dropped by the tick later.
        self.backlog.retain(|queued| queued != &query);
        let id = self.obtain_free_worker(fx);
        self.start_worker(id, query, fx);
        id
    }

    fn request(&mut self, query: Query, fx: &mut Vec<Effect>) {
        self.cancel_pending_delay();
        let id = self.prefetch_immediately(query, fx);
        self.set_active(Some(id), fx);
    }

    fn delay_request(&mut self, query: Query, fx: &mut Vec<Effect>) {
        if self.worker_holding(&query).is_some() {
            self.request(query, fx);
            return;
        }
        prefetch_trace!("Delaying request for {}", query);
        self.pending_delay = Some(query);
        self.debounce_generation += 1;
        fx.push(Effect::ArmDebounce {
            generation: self.debounce_generation,
            after: self.config.delay_debounce,
        });
    }

    fn debounce_elapsed(&mut self, generation: u64, fx: &mut Vec<Effect>) {
        if generation != self.debounce_generation {
            return;
        }
        if let Some(query) = self.pending_delay.take() {
            self.request(query.clone(), fx);
            fx.push(Effect::Notify(Notification::DelayedRequestActivated(query)));
        }
    }

    fn cancel_pending_delay(&mut self) {
        if self.pending_delay.take().is_some() {
            self.debounce_generation += 1;
        }
    }

    fn discard(&mut self, correlation_id: CorrelationId, fx: &mut Vec<Effect>) {
        let doomed: Vec<WorkerId> = self
            .workers
            .iter()
            .filter(|w| {
                w.query
                    .as_ref()
                    .is_some_and(|q| q.correlation_id() == correlation_id)
            })
            .map(|w| w.id)
            .collect();

        if self.active.is_some_and(|id| doomed.contains(&id)) {
            self.set_active(None, fx);
        }
        for id in &doomed {
            self.free_worker(*id, fx);
        }

        self.backlog.retain(|q| q.correlation_id() != correlation_id);
        if self
            .pending_delay
            .as_ref()
            .is_some_and(|q| q.correlation_id() == correlation_id)
        {
            self.cancel_pending_delay();
        }

        if !doomed.is_empty() {
            prefetch_debug!(
                "Discarded correlation id {} from {} worker(s)",
                correlation_id,
                doomed.len()
            );
        }
        self.recycle_workers(fx);
    }

    fn reset(&mut self, fx: &mut Vec<Effect>) {
        // Clear the backlog first so nothing is restarted while freeing.
        self.backlog.clear();
        self.cancel_pending_delay();
        self.set_active(None, fx);
        let ids: Vec<WorkerId> = self.workers.iter().map(|w| w.id).collect();
        for id in ids {
            self.free_worker(id, fx);
        }
        self.recycle_workers(fx);
    }

    fn issue_prefetch(&mut self, fx: &mut Vec<Effect>) {
        if self.backlog.is_empty() {
            return;
        }
        let Some(id) = self.workers.iter().find(|w| w.is_free()).map(|w| w.id) else {
            return;
        };
        let Some(query) = self.backlog.pop_front() else {
            return;
        };
        if self.worker_holding(&query).is_some() {
            prefetch_trace!("Dropping backlog entry {}; already held", query);
            return;
        }
        self.start_worker(id, query, fx);
    }

    fn obtain_free_worker(&mut self, fx: &mut Vec<Effect>) -> WorkerId {
        if let Some(id) = self.workers.iter().find(|w| w.is_free()).map(|w| w.id) {
            return id;
        }
        if let Some(cap) = self.config.max_workers {
            if self.workers.len() >= cap {
                if let Some(id) = self.evict_for_reuse(fx) {
                    return id;
                }
                prefetch_warn!(
                    "No evictable worker at cap {}; growing pool to {}",
                    cap,
                    self.workers.len() + 1
                );
            }
        }
        let id = self.allocate_worker();
        prefetch_debug!("Allocated worker {} (pool size {})", id, self.workers.len());
        id
    }

    /// Frees the least recently started non-active worker and requeues its query at the front.
    fn evict_for_reuse(&mut self, fx: &mut Vec<Effect>) -> Option<WorkerId> {
        let victim = self
            .workers
            .iter()
            .filter(|w| !w.is_free() && Some(w.id) != self.active)
            .min_by_key(|w| w.started_seq)
            .map(|w| w.id)?;
        let query = self.slot(victim).and_then(|w| w.query.clone());
        self.free_worker(victim, fx);
        if let Some(query) = query {
            prefetch_debug!("Evicted {} from worker {}", query, victim);
            self.backlog.push_front(query);
        }
        Some(victim)
    }

    fn start_worker(&mut self, id: WorkerId, query: Query, fx: &mut Vec<Effect>) {
        let (ticket, seq) = self.issue_ticket();
        let url = match self.config.query.url_for(&query) {
            Ok(url) => url.to_string(),
            Err(err) => {
                // An empty URL makes the fetch fail, which degrades to "no result".
                prefetch_warn!("Cannot build URL for {}: {}", query, err);
                String::new()
            }
        };
        let timeout = self.config.worker_timeout;
        let Some(slot) = self.slot_mut(id) else {
            prefetch_warn!("start on unknown worker {}", id);
            return;
        };
        if !slot.is_free() {
            debug_assert!(false, "start on non-free worker {id}");
            prefetch_warn!("Ignoring start of {} on busy worker {}", query, id);
            return;
        }
        slot.query = Some(query.clone());
        slot.phase = Phase::Working;
        slot.progress = 0;
        slot.ticket = ticket;
        slot.forced_stop = false;
        slot.timed_out = false;
        slot.started_seq = seq;
        slot.page = None;
        prefetch_debug!("Worker {} starts {} ({})", id, query, url);
        fx.push(Effect::StartFetch {
            worker: id,
            ticket,
            query,
            url,
            timeout,
        });
    }

    fn stop_worker(&mut self, id: WorkerId, fx: &mut Vec<Effect>) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.phase == Phase::Working {
                slot.forced_stop = true;
                fx.push(Effect::StopFetch { worker: id });
            }
        }
    }

    /// Like `stop_worker`, but the completion is still treated as a result.
    fn time_out_worker(&mut self, id: WorkerId, fx: &mut Vec<Effect>) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.phase == Phase::Working {
                slot.timed_out = true;
                fx.push(Effect::StopFetch { worker: id });
            }
        }
    }

    fn free_worker(&mut self, id: WorkerId, fx: &mut Vec<Effect>) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.phase == Phase::Working {
                fx.push(Effect::StopFetch { worker: id });
            }
            slot.clear();
        }
    }

    /// Destroys free workers while the pool is above its baseline size.
    fn recycle_workers(&mut self, fx: &mut Vec<Effect>) {
        while self.workers.len() > self.config.baseline_size {
            let active = self.active;
            let Some(pos) = self
                .workers
                .iter()
                .position(|w| w.is_free() && Some(w.id) != active)
            else {
                break;
            };
            let removed = self.workers.remove(pos);
            prefetch_debug!("Recycled worker {}", removed.id);
            fx.push(Effect::DestroyWorker { worker: removed.id });
        }
    }

    fn set_active(&mut self, next: Option<WorkerId>, fx: &mut Vec<Effect>) {
        if self.active != next {
            self.active = next;
            fx.push(Effect::Notify(Notification::ActiveWorkerChanged(next)));
        }
        let Some(slot) = next.and_then(|id| self.slot(id)) else {
            fx.push(Effect::Notify(Notification::ActiveProgressChanged(None)));
            return;
        };
        let progress = if slot.phase == Phase::Finished {
            100
        } else {
            slot.progress
        };
        fx.push(Effect::Notify(Notification::ActiveProgressChanged(Some(
            progress,
        ))));
        if let (Some(query), Some(page)) = (&slot.query, &slot.page) {
            fx.push(Effect::Notify(Notification::ActivePageReady {
                worker: slot.id,
                query: query.clone(),
                page: page.clone(),
            }));
        }
    }

    /// The worker's slot if `ticket` is still its current, non-freed assignment.
    fn live_slot(&self, id: WorkerId, ticket: Ticket) -> Option<&WorkerSlot> {
        self.slot(id).filter(|w| w.ticket == ticket && !w.is_free())
    }

    fn apply_progress(&mut self, id: WorkerId, ticket: Ticket, percent: u8, fx: &mut Vec<Effect>) {
        if self.live_slot(id, ticket).is_none() {
            prefetch_trace!("Stale progress from worker {} ticket {}", id, ticket);
            return;
        }
        let is_active = self.active == Some(id);
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        if slot.phase != Phase::Working {
            return;
        }
        let percent = percent.min(100);
        slot.progress = percent;
        if percent == 100 {
            slot.phase = Phase::Finished;
        }
        if is_active {
            fx.push(Effect::Notify(Notification::ActiveProgressChanged(Some(
                percent,
            ))));
        }
    }

    fn apply_finished(
        &mut self,
        id: WorkerId,
        ticket: Ticket,
        report: FetchReport,
        fx: &mut Vec<Effect>,
    ) {
        if self.live_slot(id, ticket).is_none() {
            prefetch_trace!("Stale completion from worker {} ticket {}", id, ticket);
            return;
        }
        let is_active = self.active == Some(id);
        let settings = self.config.query.clone();
        let worker_timeout = self.config.worker_timeout;
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        let Some(query) = slot.query.clone() else {
            return;
        };

        let forced = std::mem::take(&mut slot.forced_stop);
        let timed_out = std::mem::take(&mut slot.timed_out);
        let progress_before = slot.progress;
        slot.phase = Phase::Finished;
        slot.progress = 100;
        match &report.outcome {
            FetchOutcome::Loaded(page) => slot.page = Some(page.clone()),
            FetchOutcome::Failed(reason) => {
                prefetch_warn!("Fetch for {} failed: {}", query, reason);
            }
            FetchOutcome::Aborted => {
                prefetch_debug!("Fetch for {} aborted", query);
            }
        }
        let page = slot.page.clone();

        if is_active {
            if progress_before != 100 {
                fx.push(Effect::Notify(Notification::ActiveProgressChanged(Some(100))));
            }
            if let Some(page) = &page {
                fx.push(Effect::Notify(Notification::ActivePageReady {
                    worker: id,
                    query: query.clone(),
                    page: page.clone(),
                }));
            }
        }

        if forced || query.kind() != QueryKind::Lookup {
            return;
        }
        if matches!(report.outcome, FetchOutcome::Aborted) && !timed_out {
            return;
        }
        if let Some(page) = &page {
            if let Some(suggestion) =
                settings.suggestion_from_final_url(query.subject(), &page.final_url)
            {
                fx.push(Effect::Notify(Notification::SuggestionFound {
                    correlation_id: query.correlation_id(),
                    suggestion,
                }));
            }
        }
        let frequency = report
            .frequency
            .or_else(|| timed_out.then(|| Frequency::timed_out(worker_timeout)));
        if let Some(frequency) = frequency {
            fx.push(Effect::Notify(Notification::FrequencyFound {
                correlation_id: query.correlation_id(),
                band: frequency.band,
                label: frequency.label,
            }));
        }
    }

    fn report_usage(&mut self, fx: &mut Vec<Effect>) {
        let usage = self.usage();
        if usage != self.last_usage {
            self.last_usage = usage;
            fx.push(Effect::Notify(Notification::UsageChanged(usage)));
        }
    }
}
