//! 刚度/阻尼增益
//!
//! 6x6 矩阵布局：左上 3x3 为平移，右下 3x3 为旋转；平移-旋转耦合块恒为零。

use franka_protocol::{Block3, CARTESIAN_DOF, DampingSpec, ImpedanceUpdate};
use nalgebra::{Matrix3, Matrix6, Vector6};

/// 初始化时的临界阻尼系数（`2·sqrt(k)`，阻尼比为 1）
pub const INITIAL_DAMPING_FACTOR: f64 = 2.0;

/// 临界阻尼：`factor * sqrt(k)`（负刚度按 0 处理）
#[inline]
pub fn critical_damping(stiffness: f64, factor: f64) -> f64 {
    factor * stiffness.max(0.0).sqrt()
}

/// 一组阻抗增益
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpedanceGains {
    /// 笛卡尔刚度
    pub stiffness: Matrix6<f64>,
    /// 笛卡尔阻尼
    pub damping: Matrix6<f64>,
    /// 零空间刚度（标量）
    pub nullspace_stiffness: f64,
}

impl ImpedanceGains {
    /// 全零增益（控制器激活后由滤波逐步升至目标）
    pub fn zeros() -> Self {
        Self {
            stiffness: Matrix6::zeros(),
            damping: Matrix6::zeros(),
            nullspace_stiffness: 0.0,
        }
    }

    /// 对角刚度 + 临界阻尼
    pub fn critically_damped(gains: &[f64; CARTESIAN_DOF], factor: f64) -> Self {
        let damping = gains.map(|k| critical_damping(k, factor));
        Self::diagonal(gains, &damping, 0.0)
    }

    /// 对角刚度 + 对角阻尼
    pub fn diagonal(
        stiffness: &[f64; CARTESIAN_DOF],
        damping: &[f64; CARTESIAN_DOF],
        nullspace_stiffness: f64,
    ) -> Self {
        Self {
            stiffness: Matrix6::from_diagonal(&Vector6::from_column_slice(stiffness)),
            damping: Matrix6::from_diagonal(&Vector6::from_column_slice(damping)),
            nullspace_stiffness,
        }
    }

    /// 由平移块与旋转块组装（耦合块为零）
    pub fn from_blocks(
        stiffness_translational: &Block3,
        stiffness_rotational: &Block3,
        damping_translational: &Block3,
        damping_rotational: &Block3,
        nullspace_stiffness: f64,
    ) -> Self {
        Self {
            stiffness: block_diagonal(stiffness_translational, stiffness_rotational),
            damping: block_diagonal(damping_translational, damping_rotational),
            nullspace_stiffness,
        }
    }

    /// 按更新消息计算新的目标增益
    ///
    /// 消息未携带零空间刚度时保留 `previous_nullspace`。
    pub fn from_update(
        update: &ImpedanceUpdate,
        critical_factor: f64,
        previous_nullspace: f64,
    ) -> Self {
        let nullspace = update.nullspace_stiffness().unwrap_or(previous_nullspace);
        match update {
            ImpedanceUpdate::Diagonal {
                stiffness, damping, ..
            } => {
                let damping = match damping {
                    DampingSpec::Critical => {
                        stiffness.map(|k| critical_damping(k, critical_factor))
                    },
                    DampingSpec::Explicit(d) => *d,
                };
                Self::diagonal(stiffness, &damping, nullspace)
            },
            ImpedanceUpdate::Coupled {
                stiffness_translational,
                stiffness_rotational,
                damping_translational,
                damping_rotational,
                ..
            } => Self::from_blocks(
                stiffness_translational,
                stiffness_rotational,
                damping_translational,
                damping_rotational,
                nullspace,
            ),
        }
    }

    /// 一阶低通：`self ← α·target + (1-α)·self`
    pub fn filter_toward(&mut self, target: &ImpedanceGains, alpha: f64) {
        self.stiffness = target.stiffness * alpha + self.stiffness * (1.0 - alpha);
        self.damping = target.damping * alpha + self.damping * (1.0 - alpha);
        self.nullspace_stiffness =
            alpha * target.nullspace_stiffness + (1.0 - alpha) * self.nullspace_stiffness;
    }

    /// 零空间阻尼（阻尼比为 1）
    #[inline]
    pub fn nullspace_damping(&self) -> f64 {
        critical_damping(self.nullspace_stiffness, INITIAL_DAMPING_FACTOR)
    }
}

impl Default for ImpedanceGains {
    fn default() -> Self {
        Self::zeros()
    }
}

fn block_diagonal(translational: &Block3, rotational: &Block3) -> Matrix6<f64> {
    let mut m = Matrix6::zeros();
    m.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&Matrix3::from_row_slice(translational.as_flattened()));
    m.fixed_view_mut::<3, 3>(3, 3)
        .copy_from(&Matrix3::from_row_slice(rotational.as_flattened()));
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_gains_are_critically_damped() {
        let gains = ImpedanceGains::critically_damped(
            &[200.0, 200.0, 200.0, 20.0, 20.0, 20.0],
            INITIAL_DAMPING_FACTOR,
        );
        assert_eq!(gains.stiffness[(0, 0)], 200.0);
        assert_eq!(gains.stiffness[(5, 5)], 20.0);
        assert_eq!(gains.stiffness[(0, 1)], 0.0);
        assert_relative_eq!(gains.damping[(1, 1)], 2.0 * 200f64.sqrt());
        assert_relative_eq!(gains.damping[(4, 4)], 2.0 * 20f64.sqrt());
        assert_eq!(gains.nullspace_stiffness, 0.0);
    }

    #[test]
    fn test_diagonal_update_with_critical_damping() {
        let update = ImpedanceUpdate::critical([200.0, 200.0, 200.0, 20.0, 20.0, 20.0]);
        let gains = ImpedanceGains::from_update(&update, 0.5, 0.0);
        let expected = [
            0.5 * 200f64.sqrt(),
            0.5 * 200f64.sqrt(),
            0.5 * 200f64.sqrt(),
            0.5 * 20f64.sqrt(),
            0.5 * 20f64.sqrt(),
            0.5 * 20f64.sqrt(),
        ];
        for (i, d) in expected.iter().enumerate() {
            assert_relative_eq!(gains.damping[(i, i)], *d, epsilon = 1e-12);
        }
        // 非对角元素为零
        assert_eq!(gains.damping[(0, 3)], 0.0);
    }

    #[test]
    fn test_diagonal_update_with_explicit_damping() {
        let update = ImpedanceUpdate::Diagonal {
            stiffness: [100.0; 6],
            damping: DampingSpec::Explicit([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            nullspace_stiffness: Some(3.0),
        };
        let gains = ImpedanceGains::from_update(&update, 0.5, 0.0);
        for i in 0..6 {
            assert_eq!(gains.damping[(i, i)], (i + 1) as f64);
        }
        assert_eq!(gains.nullspace_stiffness, 3.0);
    }

    #[test]
    fn test_coupled_update_leaves_cross_blocks_zero() {
        let update = ImpedanceUpdate::Coupled {
            stiffness_translational: [[100.0, 5.0, 1.0], [5.0, 110.0, 2.0], [1.0, 2.0, 120.0]],
            stiffness_rotational: [[10.0, 0.5, 0.0], [0.5, 11.0, 0.0], [0.0, 0.0, 12.0]],
            damping_translational: [[20.0, 0.0, 0.0], [0.0, 21.0, 0.0], [0.0, 0.0, 22.0]],
            damping_rotational: [[2.0, 0.1, 0.0], [0.1, 2.1, 0.0], [0.0, 0.0, 2.2]],
            nullspace_stiffness: None,
        };
        let gains = ImpedanceGains::from_update(&update, 0.5, 7.0);

        // 行优先：[0][1] → (0, 1)
        assert_eq!(gains.stiffness[(0, 1)], 5.0);
        assert_eq!(gains.stiffness[(2, 0)], 1.0);
        assert_eq!(gains.stiffness[(3, 4)], 0.5);
        assert_eq!(gains.stiffness[(5, 5)], 12.0);
        assert_eq!(gains.damping[(4, 3)], 0.1);

        for r in 0..3 {
            for c in 3..6 {
                assert_eq!(gains.stiffness[(r, c)], 0.0);
                assert_eq!(gains.stiffness[(c, r)], 0.0);
                assert_eq!(gains.damping[(r, c)], 0.0);
                assert_eq!(gains.damping[(c, r)], 0.0);
            }
        }
        // 未给出零空间刚度时保留旧值
        assert_eq!(gains.nullspace_stiffness, 7.0);
    }

    #[test]
    fn test_filter_toward_target() {
        let target = ImpedanceGains::critically_damped(&[100.0; 6], 2.0);
        let mut gains = ImpedanceGains::zeros();
        gains.filter_toward(&target, 0.25);
        assert_relative_eq!(gains.stiffness[(2, 2)], 25.0);
        assert_relative_eq!(gains.damping[(2, 2)], 5.0);

        gains.filter_toward(&target, 0.25);
        assert_relative_eq!(gains.stiffness[(2, 2)], 43.75);
    }

    #[test]
    fn test_nullspace_damping() {
        let gains = ImpedanceGains {
            nullspace_stiffness: 16.0,
            ..ImpedanceGains::zeros()
        };
        assert_eq!(gains.nullspace_damping(), 8.0);
        assert_eq!(critical_damping(-4.0, 2.0), 0.0);
    }
}
