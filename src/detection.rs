//! 検出ループ
//!
//! カメラのフレームごとに呼ばれ、`sampling_interval` フレームに1回だけ姿勢推定を投げる。
//! 推定は同時に1つまで。停止やリセットの後に届いた古い結果は捨てる。

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, RenderConfig};
use crate::exercise::ExerciseType;
use crate::metrics::Metrics;
use crate::pose::Pose;
use crate::render::{draw_hud, draw_overlay, DrawPrimitive};
use crate::session::Session;

/// 発行した推定リクエストの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    id: u64,
}

/// 推定を走らせるフレームを決める
#[derive(Debug)]
pub struct FrameGate {
    interval: u64,
    frame: u64,
    next_id: u64,
    generation: u64,
    in_flight: Option<Ticket>,
}

impl FrameGate {
    pub fn new(sampling_interval: u32) -> Self {
        Self {
            interval: u64::from(sampling_interval.max(1)),
            frame: 0,
            next_id: 0,
            generation: 0,
            in_flight: None,
        }
    }

    /// 表示フレームごとに1回呼ぶ。推定すべきフレームなら Ticket を返す
    pub fn tick(&mut self) -> Option<Ticket> {
        let due = self.frame % self.interval == 0;
        self.frame += 1;
        if !due {
            return None;
        }
        if self.in_flight.is_some() {
            tracing::debug!(frame = self.frame - 1, "estimation in flight, skipping frame");
            return None;
        }
        let ticket = Ticket {
            generation: self.generation,
            id: self.next_id,
        };
        self.next_id += 1;
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// 結果を受け取ってよいか。現在の世代の実行中チケットのみ true
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            tracing::warn!(
                ?ticket,
                generation = self.generation,
                "discarding stale estimation result"
            );
            false
        }
    }

    /// 実行中の推定を無効にする
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// FrameGate とセッションをまとめたもの
///
/// 推定しないフレームでは直前のポーズをそのまま描画に使う。
pub struct FrameDriver {
    gate: FrameGate,
    session: Session,
    last_pose: Option<Pose>,
    render: RenderConfig,
}

impl FrameDriver {
    pub fn new(exercise: ExerciseType, config: &Config) -> Self {
        Self::with_session(Session::start(exercise, config), config)
    }

    pub fn with_session(session: Session, config: &Config) -> Self {
        Self {
            gate: FrameGate::new(config.session.sampling_interval),
            session,
            last_pose: None,
            render: config.render.clone(),
        }
    }

    pub fn on_frame(&mut self) -> Option<Ticket> {
        self.gate.tick()
    }

    /// 推定結果を反映する。古い結果なら None
    pub fn on_estimate(&mut self, ticket: Ticket, pose: Option<Pose>) -> Option<Metrics> {
        let elapsed = self.session.elapsed();
        self.on_estimate_at(ticket, pose, elapsed)
    }

    pub fn on_estimate_at(
        &mut self,
        ticket: Ticket,
        pose: Option<Pose>,
        elapsed: Duration,
    ) -> Option<Metrics> {
        if !self.gate.complete(ticket) {
            return None;
        }
        let metrics = match pose {
            Some(pose) => {
                let metrics = self.session.process_frame_at(&pose, elapsed);
                self.last_pose = Some(pose);
                metrics
            }
            None => {
                self.last_pose = None;
                self.session.record_missed_frame_at(elapsed)
            }
        };
        Some(metrics)
    }

    /// 直前のポーズの骨格とメトリクス表示
    pub fn overlay(&self) -> Vec<DrawPrimitive> {
        let mut prims = match &self.last_pose {
            Some(pose) => draw_overlay(pose, self.session.exercise(), &self.render),
            None => Vec::new(),
        };
        prims.extend(draw_hud(self.session.metrics()));
        prims
    }

    pub fn metrics(&self) -> &Metrics {
        self.session.metrics()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn last_pose(&self) -> Option<&Pose> {
        self.last_pose.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn stop(&mut self) {
        self.gate.cancel();
    }

    /// 実行中の推定を捨ててセッションを最初からやり直す
    pub fn reset(&mut self) {
        self.gate.cancel();
        self.session.reset();
        self.last_pose = None;
    }
}

/// 外部の姿勢推定器
pub trait PoseEstimator<F> {
    /// 人が見つからなければ None
    fn estimate(&self, frame: F) -> BoxFuture<'static, Option<Pose>>;
}

/// 実行中のループへの指示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// 実行中の推定を捨て、セッションを最初からやり直す
    Reset,
}

/// フレームごとに送る描画とメトリクス
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    pub overlay: Vec<DrawPrimitive>,
    pub metrics: Metrics,
}

pub struct DetectionLoop<E> {
    estimator: E,
    driver: FrameDriver,
}

impl<E> DetectionLoop<E> {
    pub fn new(estimator: E, exercise: ExerciseType, config: &Config) -> Self {
        Self {
            estimator,
            driver: FrameDriver::new(exercise, config),
        }
    }

    fn update(&self) -> FrameUpdate {
        FrameUpdate {
            overlay: self.driver.overlay(),
            metrics: self.driver.metrics().clone(),
        }
    }

    /// フレームが尽きるか `cancel` されるまで回し、最終的なメトリクスを返す
    ///
    /// フレームが尽きた場合は実行中の推定を待ってから終わる。キャンセル時は待たずに中断する。
    /// `controls` の [`Control::Reset`] はフレームより先に処理し、リセット後の状態を1回送る。
    pub async fn run<F>(
        mut self,
        mut frames: mpsc::Receiver<F>,
        mut controls: mpsc::Receiver<Control>,
        updates: mpsc::Sender<FrameUpdate>,
        cancel: CancellationToken,
    ) -> Metrics
    where
        E: PoseEstimator<F>,
    {
        let (result_tx, mut result_rx) = mpsc::channel::<(Ticket, Option<Pose>)>(1);
        let mut pending: Option<(Ticket, JoinHandle<()>)> = None;
        let mut frames_open = true;
        let mut controls_open = true;

        loop {
            if !frames_open && pending.is_none() {
                break;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("detection loop cancelled");
                    break;
                }
                control = controls.recv(), if controls_open => {
                    match control {
                        Some(Control::Reset) => {
                            if let Some((_, handle)) = pending.take() {
                                handle.abort();
                            }
                            self.driver.reset();
                            tracing::info!("session reset");
                            if updates.send(self.update()).await.is_err() {
                                break;
                            }
                        }
                        None => controls_open = false,
                    }
                }
                Some((ticket, pose)) = result_rx.recv() => {
                    if pending.as_ref().is_some_and(|(current, _)| *current == ticket) {
                        pending = None;
                    }
                    if let Some(metrics) = self.driver.on_estimate(ticket, pose) {
                        tracing::trace!(reps = metrics.rep_count, "estimation applied");
                    }
                }
                frame = frames.recv(), if frames_open => {
                    let Some(frame) = frame else {
                        frames_open = false;
                        continue;
                    };
                    if let Some(ticket) = self.driver.on_frame() {
                        let estimate = self.estimator.estimate(frame);
                        let tx = result_tx.clone();
                        let handle = tokio::spawn(async move {
                            let pose = estimate.await;
                            let _ = tx.send((ticket, pose)).await;
                        });
                        pending = Some((ticket, handle));
                    }
                    if updates.send(self.update()).await.is_err() {
                        tracing::info!("update receiver dropped, stopping detection loop");
                        break;
                    }
                }
            }
        }

        self.driver.stop();
        if let Some((_, handle)) = pending.take() {
            handle.abort();
        }
        self.driver.metrics().clone()
    }
}
