//! Time-bounded, eased animations driven from the frame clock.
//!
//! [`EffectAnimator`] owns every running animation in a slab arena and hands
//! out generation-checked [`AnimationHandle`]s, so a handle to an animation
//! that already finished (or was abandoned) can never touch whatever reused
//! its slot. All animations are advanced by a single [`EffectAnimator::tick`]
//! per frame, but each measures progress from its own start time.
//!
//! Callbacks receive a caller-chosen context `C` mutably instead of capturing
//! shared state, which keeps everything on the UI thread and lock-free.

use crate::clock::Timestamp;
use slab::Slab;
use std::time::Duration;

/// Easing curves mapping linear progress to visual progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    /// `1 - (1 - p)^3`: fast start, gentle landing.
    #[default]
    EaseOutCubic,
    /// `p^3`: gentle start, fast finish.
    EaseInCubic,
    EaseInOutCubic,
}

impl Easing {
    /// Apply the curve to `progress`, clamped to `[0, 1]`.
    pub fn apply(self, progress: f64) -> f64 {
        let p = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        match self {
            Easing::Linear => p,
            Easing::EaseOutCubic => 1.0 - (1.0 - p).powi(3),
            Easing::EaseInCubic => p.powi(3),
            Easing::EaseInOutCubic => {
                if p < 0.5 {
                    4.0 * p.powi(3)
                } else {
                    1.0 - (-2.0 * p + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Per-frame draw callback, called with eased progress.
pub type DrawFn<C> = Box<dyn FnMut(f64, &mut C)>;
/// Called exactly once when the animation finishes or is abandoned.
pub type DoneFn<C> = Box<dyn FnOnce(&mut C)>;

/// Reference to a running animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationHandle {
    index: usize,
    generation: u64,
}

struct AnimationInstance<C> {
    generation: u64,
    start: Timestamp,
    duration: Duration,
    easing: Easing,
    scope: Option<u64>,
    last_progress: Option<f64>,
    draw: DrawFn<C>,
    done: Option<DoneFn<C>>,
}

impl<C> AnimationInstance<C> {
    fn linear_progress(&self, now: Timestamp) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    fn finish(mut self, ctx: &mut C) {
        if let Some(done) = self.done.take() {
            done(ctx);
        }
    }
}

/// Scheduler for any number of independent animations.
pub struct EffectAnimator<C> {
    instances: Slab<AnimationInstance<C>>,
    next_generation: u64,
}

impl<C> Default for EffectAnimator<C> {
    fn default() -> Self {
        Self {
            instances: Slab::new(),
            next_generation: 0,
        }
    }
}

impl<C> EffectAnimator<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an animation at `now`.
    ///
    /// `scope` is an opaque tag (the engine uses the surface generation) that
    /// [`abandon_where`](Self::abandon_where) can match on. Nothing is drawn
    /// until the next [`tick`](Self::tick).
    pub fn start(
        &mut self,
        now: Timestamp,
        duration: Duration,
        easing: Easing,
        scope: Option<u64>,
        draw: DrawFn<C>,
        done: DoneFn<C>,
    ) -> AnimationHandle {
        let generation = self.next_generation;
        self.next_generation += 1;
        let index = self.instances.insert(AnimationInstance {
            generation,
            start: now,
            duration,
            easing,
            scope,
            last_progress: None,
            draw,
            done: Some(done),
        });
        AnimationHandle { index, generation }
    }

    /// Advance every animation to `now`.
    ///
    /// Each draw callback sees strictly increasing progress: a tick that
    /// would not move an animation forward skips it. An animation whose time
    /// is up is drawn at exactly `1.0` (unless it already was), then its
    /// completion runs and it is removed. Returns how many completed.
    pub fn tick(&mut self, now: Timestamp, ctx: &mut C) -> usize {
        let mut finished = Vec::new();
        for (index, instance) in self.instances.iter_mut() {
            let linear = instance.linear_progress(now);
            if instance.last_progress.is_none_or(|last| linear > last) {
                instance.last_progress = Some(linear);
                (instance.draw)(instance.easing.apply(linear), ctx);
            }
            if linear >= 1.0 {
                finished.push(index);
            }
        }

        for index in &finished {
            self.instances.remove(*index).finish(ctx);
        }
        finished.len()
    }

    /// Stop one animation early. Its completion still runs; no further draws.
    pub fn cancel(&mut self, handle: AnimationHandle, ctx: &mut C) -> bool {
        if !self.is_running(handle) {
            return false;
        }
        self.instances.remove(handle.index).finish(ctx);
        true
    }

    /// Abandon every animation whose scope matches `predicate`.
    ///
    /// Completions run (so whatever they release is released), draws stop.
    pub fn abandon_where(
        &mut self,
        mut predicate: impl FnMut(Option<u64>) -> bool,
        ctx: &mut C,
    ) -> usize {
        let doomed: Vec<usize> = self
            .instances
            .iter()
            .filter(|(_, instance)| predicate(instance.scope))
            .map(|(index, _)| index)
            .collect();
        for index in &doomed {
            self.instances.remove(*index).finish(ctx);
        }
        doomed.len()
    }

    pub fn abandon_all(&mut self, ctx: &mut C) -> usize {
        self.abandon_where(|_| true, ctx)
    }

    pub fn is_running(&self, handle: AnimationHandle) -> bool {
        self.instances
            .get(handle.index)
            .is_some_and(|instance| instance.generation == handle.generation)
    }

    pub fn active_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_idle(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        draws: Vec<Vec<f64>>,
        done: Vec<usize>,
    }

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn spawn(
        animator: &mut EffectAnimator<Log>,
        id: usize,
        start: Timestamp,
        ms: u64,
    ) -> AnimationHandle {
        animator.start(
            start,
            Duration::from_millis(ms),
            Easing::EaseOutCubic,
            Some(id as u64 % 3),
            Box::new(move |p, log: &mut Log| log.draws[id].push(p)),
            Box::new(move |log: &mut Log| log.done.push(id)),
        )
    }

    #[test]
    fn test_easing_curves() {
        assert_eq!(Easing::EaseOutCubic.apply(0.0), 0.0);
        assert_eq!(Easing::EaseOutCubic.apply(1.0), 1.0);
        assert!((Easing::EaseOutCubic.apply(0.5) - 0.875).abs() < 1e-12);
        assert!((Easing::EaseInCubic.apply(0.5) - 0.125).abs() < 1e-12);
        assert!((Easing::EaseInOutCubic.apply(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
        assert_eq!(Easing::Linear.apply(f64::NAN), 0.0);
    }

    #[test]
    fn test_fifty_staggered_animations() {
        const N: usize = 50;
        let mut animator = EffectAnimator::new();
        let mut log = Log {
            draws: vec![Vec::new(); N],
            done: Vec::new(),
        };

        // Start one every 7ms with varying durations while ticking at ~60Hz.
        let mut started = 0;
        let mut now = 0;
        while started < N || !animator.is_idle() {
            while started < N && (started as u64) * 7 <= now {
                let duration = 150 + (started as u64 % 5) * 40;
                spawn(&mut animator, started, at(started as u64 * 7), duration);
                started += 1;
            }
            animator.tick(at(now), &mut log);
            now += 16;
            assert!(now < 10_000, "animations never finished");
        }

        assert_eq!(log.done.len(), N);
        let mut done = log.done.clone();
        done.sort();
        done.dedup();
        assert_eq!(done.len(), N, "a completion fired more than once");

        for draws in &log.draws {
            assert!(!draws.is_empty());
            assert!(draws.windows(2).all(|w| w[1] > w[0]), "{draws:?}");
            assert!(draws[0] >= 0.0);
            assert_eq!(*draws.last().unwrap(), 1.0);
        }
    }

    #[test]
    fn test_progress_measured_from_own_start() {
        let mut animator = EffectAnimator::new();
        let mut log = Log {
            draws: vec![Vec::new(); 2],
            done: Vec::new(),
        };
        animator.start(
            at(0),
            Duration::from_millis(100),
            Easing::Linear,
            None,
            Box::new(|p, log: &mut Log| log.draws[0].push(p)),
            Box::new(|_: &mut Log| {}),
        );
        animator.start(
            at(50),
            Duration::from_millis(100),
            Easing::Linear,
            None,
            Box::new(|p, log: &mut Log| log.draws[1].push(p)),
            Box::new(|_: &mut Log| {}),
        );

        animator.tick(at(75), &mut log);
        assert!((log.draws[0][0] - 0.75).abs() < 1e-9);
        assert!((log.draws[1][0] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_abandon_runs_completion_without_draw() {
        let mut animator = EffectAnimator::new();
        let mut log = Log {
            draws: vec![Vec::new(); 4],
            done: Vec::new(),
        };
        for id in 0..4 {
            spawn(&mut animator, id, at(0), 1_000);
        }
        // Scopes are id % 3: ids 0 and 3 share scope 0.
        let abandoned = animator.abandon_where(|scope| scope == Some(0), &mut log);
        assert_eq!(abandoned, 2);
        log.done.sort();
        assert_eq!(log.done, vec![0, 3]);

        animator.tick(at(500), &mut log);
        assert!(log.draws[0].is_empty());
        assert!(log.draws[3].is_empty());
        assert_eq!(log.draws[1].len(), 1);

        assert_eq!(animator.abandon_all(&mut log), 2);
        assert!(animator.is_idle());
        assert_eq!(log.done.len(), 4);
    }

    #[test]
    fn test_stale_handle_cannot_cancel_reused_slot() {
        let mut animator = EffectAnimator::new();
        let mut log = Log {
            draws: vec![Vec::new(); 2],
            done: Vec::new(),
        };
        let first = spawn(&mut animator, 0, at(0), 10);
        animator.tick(at(10), &mut log);
        assert!(!animator.is_running(first));

        let second = spawn(&mut animator, 1, at(10), 10);
        assert!(!animator.cancel(first, &mut log));
        assert!(animator.is_running(second));
        assert!(animator.cancel(second, &mut log));
        assert_eq!(log.done, vec![0, 1]);
    }

    #[test]
    fn test_zero_duration_completes_on_first_tick() {
        let mut animator = EffectAnimator::new();
        let mut log = Log {
            draws: vec![Vec::new(); 1],
            done: Vec::new(),
        };
        spawn(&mut animator, 0, at(5), 0);
        assert_eq!(animator.tick(at(5), &mut log), 1);
        assert_eq!(log.draws[0], vec![1.0]);
        assert_eq!(log.done, vec![0]);
    }
}
