//! 场景描述文件（JSON）
//!
//! 所有字段都有默认值，命令行参数可在读取后覆盖。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::time::SimTime;
use crate::slice::{
    BackgroundConfig, ClassParams, ClassParamsTable, PairSelection, SliceError, SliceType,
};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    #[error("duration must be a positive number of seconds, got {0}")]
    InvalidDuration(f64),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Slice(#[from] SliceError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSpec {
    pub topology: TopologySpec,
    pub duration_s: f64,
    pub max_packets: u64,
    pub num_apps: u32,
    pub seed: u64,
    pub selection: PairSelection,
    pub slices: SliceMix,
    /// 覆盖默认的分类参数（未列出的类型保持默认）
    pub class_params: BTreeMap<SliceType, ClassParams>,
    /// 只覆盖调度权重
    pub weights: BTreeMap<SliceType, u32>,
    /// 是否在交换机出口安装分类调度器
    pub slice_queues: bool,
    pub owd_csv: Option<PathBuf>,
    /// 未标记的背景突发流；缺省时不产生
    pub background: Option<BackgroundConfig>,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            topology: TopologySpec::default(),
            duration_s: 10.0,
            max_packets: 100,
            num_apps: 2,
            seed: 1,
            selection: PairSelection::Random,
            slices: SliceMix::default(),
            class_params: BTreeMap::new(),
            weights: BTreeMap::new(),
            slice_queues: true,
            owd_csv: None,
            background: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    /// 左侧主机 - s0 - s1 - 右侧主机；左侧为源，右侧为宿
    Dumbbell {
        #[serde(default = "default_hosts")]
        hosts_per_side: usize,
        #[serde(default = "default_host_link_mbps")]
        host_link_mbps: u64,
        #[serde(default = "default_bottleneck_mbps")]
        bottleneck_mbps: u64,
        #[serde(default = "default_latency_us")]
        link_latency_us: u64,
    },
    /// 交换机链，每台交换机挂若干主机；所有主机既是源也是宿
    Linear {
        #[serde(default = "default_switches")]
        switches: usize,
        #[serde(default = "default_hosts")]
        hosts_per_switch: usize,
        #[serde(default = "default_host_link_mbps")]
        link_mbps: u64,
        #[serde(default = "default_latency_us")]
        link_latency_us: u64,
    },
}

fn default_hosts() -> usize {
    2
}
fn default_switches() -> usize {
    3
}
fn default_host_link_mbps() -> u64 {
    1_000
}
fn default_bottleneck_mbps() -> u64 {
    100
}
fn default_latency_us() -> u64 {
    100
}

impl TopologySpec {
    pub fn linear() -> Self {
        TopologySpec::Linear {
            switches: default_switches(),
            hosts_per_switch: default_hosts(),
            link_mbps: default_host_link_mbps(),
            link_latency_us: default_latency_us(),
        }
    }
}

impl Default for TopologySpec {
    fn default() -> Self {
        TopologySpec::Dumbbell {
            hosts_per_side: default_hosts(),
            host_link_mbps: default_host_link_mbps(),
            bottleneck_mbps: default_bottleneck_mbps(),
            link_latency_us: default_latency_us(),
        }
    }
}

/// 切片的类型构成
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SliceMix {
    /// 类型均匀随机
    Total { count: u32 },
    PerClass { counts: BTreeMap<SliceType, u32> },
    /// 按概率抽取类型
    Weighted {
        count: u32,
        probabilities: BTreeMap<SliceType, f64>,
    },
}

impl Default for SliceMix {
    fn default() -> Self {
        SliceMix::Total { count: 3 }
    }
}

impl SliceMix {
    /// 切片总数
    pub fn total(&self) -> u32 {
        match self {
            SliceMix::Total { count } | SliceMix::Weighted { count, .. } => *count,
            SliceMix::PerClass { counts } => counts.values().sum(),
        }
    }
}

impl ScenarioSpec {
    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn duration(&self) -> SimTime {
        SimTime::from_secs_f64(self.duration_s)
    }

    /// 默认参数表叠加 `class_params` 与 `weights`
    pub fn class_table(&self) -> ClassParamsTable {
        let mut table = ClassParamsTable::default();
        for (&class, &params) in &self.class_params {
            table.set(class, params);
        }
        for (&class, &w) in &self.weights {
            table.set_weight(class, w);
        }
        table
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !self.duration_s.is_finite() || self.duration_s <= 0.0 {
            return Err(ScenarioError::InvalidDuration(self.duration_s));
        }
        match self.topology {
            TopologySpec::Dumbbell { hosts_per_side, .. } if hosts_per_side == 0 => {
                return Err(ScenarioError::InvalidTopology(
                    "dumbbell needs at least one host per side".into(),
                ));
            }
            TopologySpec::Linear {
                switches,
                hosts_per_switch,
                ..
            } if switches == 0 || switches * hosts_per_switch < 2 => {
                return Err(ScenarioError::InvalidTopology(
                    "linear topology needs at least one switch and two hosts".into(),
                ));
            }
            _ => {}
        }
        self.class_table().validate()?;
        if let Some(bg) = &self.background {
            bg.validate()?;
        }
        Ok(())
    }
}
