// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::Rng;
use std::time::Duration;

const SCROLL_MIN_PX: u32 = 300;
const SCROLL_MAX_PX: u32 = 1500;

/// 一次页面访问中的拟人行为
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorPlan {
    /// 滚动步长（像素），依次执行
    pub scroll_steps: Vec<u32>,
    /// 滚动后的停顿
    pub pause: Duration,
    /// 视口内的鼠标轨迹
    pub mouse_path: Vec<(f64, f64)>,
}

impl BehaviorPlan {
    /// 随机生成行为计划
    ///
    /// # 参数
    ///
    /// * `viewport` - 视口宽高
    /// * `pause_ms` - 停顿区间（毫秒，闭区间）
    pub fn random(viewport: (u32, u32), pause_ms: (u64, u64)) -> Self {
        let mut rng = rand::rng();

        let total = rng.random_range(SCROLL_MIN_PX..=SCROLL_MAX_PX);
        let step_count = rng.random_range(2..=4u32);
        let mut scroll_steps = Vec::with_capacity(step_count as usize);
        let mut remaining = total;
        for i in 0..step_count {
            let step = if i + 1 == step_count {
                remaining
            } else {
                let share = remaining / (step_count - i);
                rng.random_range(share / 2..=share)
            };
            remaining -= step;
            scroll_steps.push(step);
        }

        let (min, max) = (pause_ms.0.min(pause_ms.1), pause_ms.0.max(pause_ms.1));
        let pause = Duration::from_millis(rng.random_range(min..=max));

        let width = viewport.0.max(1) as f64;
        let height = viewport.1.max(1) as f64;
        let mouse_path = (0..rng.random_range(2..=5))
            .map(|_| {
                (
                    rng.random_range(0.0..width).floor(),
                    rng.random_range(0.0..height).floor(),
                )
            })
            .collect();

        Self {
            scroll_steps,
            pause,
            mouse_path,
        }
    }

    pub fn total_scroll(&self) -> u32 {
        self.scroll_steps.iter().sum()
    }

    /// 滚动脚本
    pub fn scroll_script(step: u32) -> String {
        format!("window.scrollBy({{ top: {}, behavior: 'smooth' }});", step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_stays_within_bounds() {
        for _ in 0..100 {
            let plan = BehaviorPlan::random((1366, 768), (1000, 3000));
            assert!((SCROLL_MIN_PX..=SCROLL_MAX_PX).contains(&plan.total_scroll()));
            assert!(plan.pause >= Duration::from_millis(1000));
            assert!(plan.pause <= Duration::from_millis(3000));
            assert!((2..=5).contains(&plan.mouse_path.len()));
            for (x, y) in &plan.mouse_path {
                assert!(*x >= 0.0 && *x < 1366.0);
                assert!(*y >= 0.0 && *y < 768.0);
            }
        }
    }

    #[test]
    fn test_scroll_script() {
        assert_eq!(
            BehaviorPlan::scroll_script(400),
            "window.scrollBy({ top: 400, behavior: 'smooth' });"
        );
    }
}
