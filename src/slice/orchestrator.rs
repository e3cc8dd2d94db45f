//! 切片编排器
//!
//! 从源/宿节点池中挑选节点对，按类型批量创建切片并安装应用；
//! 运行结束后汇总各切片统计并导出 OWD 记录。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::class::SliceType;
use super::error::SliceError;
use super::export::{sort_rows, write_owd_csv, OwdRow};
use super::params::ClassParamsTable;
use super::report::SliceReport;
use super::instance::{base_port, Slice, SliceConfig, MAX_APPS_PER_SLICE};
use crate::net::{Network, NodeId};
use crate::sim::{SimTime, Simulator};

/// 源/宿节点对的挑选方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairSelection {
    #[default]
    Random,
    RoundRobin,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 仿真时长；切片在 [0, duration/2] 内随机开始，在 duration 结束
    pub duration: SimTime,
    /// 每个应用的发包上限（0 = 不限）
    pub max_packets: u64,
    pub num_apps: u32,
    pub seed: u64,
    pub selection: PairSelection,
    pub classes: ClassParamsTable,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            duration: SimTime::from_secs(10),
            max_packets: 1,
            num_apps: 2,
            seed: 1,
            selection: PairSelection::Random,
            classes: ClassParamsTable::default(),
        }
    }
}

#[derive(Debug)]
pub struct SliceOrchestrator {
    cfg: OrchestratorConfig,
    rng: StdRng,
    last_slice_id: u32,
    rr_cursor: usize,
    slices: Vec<Slice>,
}

impl SliceOrchestrator {
    pub fn new(cfg: OrchestratorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(cfg.seed),
            cfg,
            last_slice_id: 0,
            rr_cursor: 0,
            slices: Vec::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn slice(&self, id: u32) -> Option<&Slice> {
        self.slices.iter().find(|s| s.id() == id)
    }

    /// 创建 `count` 个类型均匀随机的切片
    pub fn create_slices(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
        sources: &[NodeId],
        sinks: &[NodeId],
        count: u32,
    ) -> Result<&[Slice], SliceError> {
        let classes = (0..count)
            .map(|_| {
                let idx = self.rng.gen_range(0..SliceType::COUNT);
                SliceType::from_index(idx).unwrap_or(SliceType::DEFAULT)
            })
            .collect();
        self.create_with_classes(net, sim, sources, sinks, classes)
    }

    /// 按类型给定数量创建切片（按类型顺序依次创建）
    pub fn create_slices_per_class(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
        sources: &[NodeId],
        sinks: &[NodeId],
        counts: &BTreeMap<SliceType, u32>,
    ) -> Result<&[Slice], SliceError> {
        let classes = counts
            .iter()
            .flat_map(|(&t, &n)| std::iter::repeat_n(t, n as usize))
            .collect();
        self.create_with_classes(net, sim, sources, sinks, classes)
    }

    /// 按概率表抽取每个切片的类型
    pub fn create_slices_weighted(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
        sources: &[NodeId],
        sinks: &[NodeId],
        count: u32,
        probabilities: &[(SliceType, f64)],
    ) -> Result<&[Slice], SliceError> {
        let dist = WeightedIndex::new(probabilities.iter().map(|(_, p)| *p))
            .map_err(|e| SliceError::InvalidProbabilities(e.to_string()))?;
        let classes = (0..count)
            .map(|_| probabilities[dist.sample(&mut self.rng)].0)
            .collect();
        self.create_with_classes(net, sim, sources, sinks, classes)
    }

    /// 先校验全部输入，再逐个创建；出错时不留下任何已调度的应用
    fn create_with_classes(
        &mut self,
        net: &mut Network,
        sim: &mut Simulator,
        sources: &[NodeId],
        sinks: &[NodeId],
        classes: Vec<SliceType>,
    ) -> Result<&[Slice], SliceError> {
        if self.cfg.duration == SimTime::ZERO {
            return Err(SliceError::ZeroDuration);
        }
        if sources.is_empty() {
            return Err(SliceError::EmptySources);
        }
        if sinks.is_empty() {
            return Err(SliceError::EmptySinks);
        }
        if classes.is_empty() {
            return Err(SliceError::ZeroSlices);
        }
        if self.cfg.num_apps == 0 {
            return Err(SliceError::ZeroApps);
        }
        if self.cfg.num_apps > MAX_APPS_PER_SLICE {
            return Err(SliceError::TooManyApps {
                requested: self.cfg.num_apps,
                max: MAX_APPS_PER_SLICE,
            });
        }
        self.cfg.classes.validate()?;
        for &n in sources.iter().chain(sinks) {
            net.node_addr(n)?;
        }
        let viable: Vec<NodeId> = sources
            .iter()
            .copied()
            .filter(|s| sinks.iter().any(|k| k != s))
            .collect();
        if viable.is_empty() {
            return Err(SliceError::NoDistinctPair(sources[0]));
        }
        let last_id = u32::try_from(classes.len())
            .ok()
            .and_then(|n| self.last_slice_id.checked_add(n))
            .ok_or(SliceError::PortRangeExhausted(u32::MAX))?;
        base_port(last_id)?;

        info!(count = classes.len(), selection = ?self.cfg.selection, "创建切片");
        let first = self.slices.len();
        let half = self.cfg.duration.as_secs_f64() / 2.0;
        for class in classes {
            let (source, sink) = self.pick_pair(&viable, sinks);
            let latest = self.cfg.duration.saturating_sub(SimTime::from_nanos(1));
            let start = SimTime::from_secs_f64(self.rng.gen_range(0.0..=half)).min(latest);
            self.last_slice_id += 1;
            let cfg = SliceConfig::new(class, source, sink)
                .with_window(start, self.cfg.duration)
                .with_num_apps(self.cfg.num_apps)
                .with_max_packets(self.cfg.max_packets);
            let mut slice = Slice::new(self.last_slice_id, cfg, self.rng.next_u64())?;
            slice.configure(&self.cfg.classes)?;
            slice.install_apps(net, sim)?;
            self.slices.push(slice);
        }
        Ok(&self.slices[first..])
    }

    /// `sources` 中的每个节点都至少有一个不同于自己的宿节点
    fn pick_pair(&mut self, sources: &[NodeId], sinks: &[NodeId]) -> (NodeId, NodeId) {
        let pick = match self.cfg.selection {
            PairSelection::Random => None,
            PairSelection::RoundRobin => {
                let i = self.rr_cursor;
                self.rr_cursor += 1;
                Some(i)
            }
        };
        let source = match pick {
            Some(i) => sources[i % sources.len()],
            None => sources[self.rng.gen_range(0..sources.len())],
        };
        let candidates: Vec<NodeId> = sinks.iter().copied().filter(|&k| k != source).collect();
        let sink = match pick {
            Some(i) => candidates[i % candidates.len()],
            None => candidates[self.rng.gen_range(0..candidates.len())],
        };
        (source, sink)
    }

    /// 汇总并记录每个切片的收发统计
    pub fn report_slice_stats(&self, net: &Network) -> Vec<SliceReport> {
        info!("====== 切片统计 ======");
        self.slices
            .iter()
            .map(|s| {
                let r = s.report(net);
                info!(
                    "[Slice {}] | Type: {} | Rx Packets: {} | Dropped: {} | Min OWD: {:.3} ms | Max OWD: {:.3} ms | Avg OWD: {:.3} ms",
                    r.slice_id,
                    r.class,
                    r.received_packets,
                    r.dropped_packets,
                    r.owd.min_ms,
                    r.owd.max_ms,
                    r.owd.avg_ms
                );
                r
            })
            .collect()
    }

    /// 所有切片的 OWD 记录，按到达时间升序
    pub fn owd_rows(&self, net: &Network) -> Vec<OwdRow> {
        let mut rows: Vec<OwdRow> = self
            .slices
            .iter()
            .flat_map(|s| {
                s.owd_records(net).into_iter().map(|r| OwdRow {
                    arrival: r.arrival,
                    owd: r.owd,
                    slice_id: s.id(),
                    class: s.class(),
                })
            })
            .collect();
        sort_rows(&mut rows);
        rows
    }

    /// 写出 OWD 表，返回行数
    pub fn write_owd_records<W: Write>(&self, net: &Network, w: W) -> Result<usize, SliceError> {
        let rows = self.owd_rows(net);
        write_owd_csv(w, &rows)?;
        Ok(rows.len())
    }

    pub fn export_owd_records(&self, net: &Network, path: impl AsRef<Path>) -> Result<usize, SliceError> {
        let path = path.as_ref();
        info!(path = %path.display(), "导出 OWD 记录");
        let file = File::create(path)?;
        let n = self.write_owd_records(net, BufWriter::new(file))?;
        info!(path = %path.display(), rows = n, "✅ OWD 记录导出完成");
        Ok(n)
    }
}
