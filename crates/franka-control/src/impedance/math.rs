//! 阻抗控制的数值工具
//!
//! - 阻尼最小二乘伪逆（SVD）
//! - 力矩变化率限幅

use franka_driver::JointVector;
use franka_protocol::{CARTESIAN_DOF, JOINT_COUNT};
use nalgebra::{Matrix6, SMatrix};

/// 雅可比转置（7x6）
pub type JacobianTranspose = SMatrix<f64, JOINT_COUNT, CARTESIAN_DOF>;

/// 雅可比转置的伪逆（6x7）
pub type JacobianTransposePinv = SMatrix<f64, CARTESIAN_DOF, JOINT_COUNT>;

/// 奇异值分母阈值，低于此值的方向直接置零
const SINGULAR_EPSILON: f64 = 1e-12;

/// 阻尼最小二乘伪逆
///
/// `pinv = V · diag(σ / (σ² + λ²)) · Uᵀ`
///
/// `λ = 0` 时退化为普通 SVD 伪逆；奇异方向（σ² + λ² ≈ 0）贡献为零，
/// 因此对奇异雅可比也不会产生 NaN。
///
/// 返回 `None` 表示 SVD 未能给出 U/V（不应在有限输入上发生）。
pub fn damped_pseudo_inverse(
    m: &JacobianTranspose,
    lambda: f64,
) -> Option<JacobianTransposePinv> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let lambda_sq = lambda * lambda;
    let inv = svd.singular_values.map(|s| {
        let denom = s * s + lambda_sq;
        if denom > SINGULAR_EPSILON { s / denom } else { 0.0 }
    });
    Some(v_t.transpose() * Matrix6::from_diagonal(&inv) * u.transpose())
}

/// 力矩变化率限幅
///
/// 每个关节相对上一周期命令的变化被钳位到 `±max_delta`：
/// `τ_out = τ_last + clamp(τ_desired - τ_last, -Δ, Δ)`
#[inline]
pub fn saturate_torque_rate(
    desired: &JointVector,
    last_commanded: &JointVector,
    max_delta: f64,
) -> JointVector {
    desired.zip_map(last_commanded, |d, last| {
        last + (d - last).clamp(-max_delta, max_delta)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::SMatrix;
    use proptest::prelude::*;

    /// 典型构型下的 Panda 雅可比（满秩）
    fn sample_jacobian_t() -> JacobianTranspose {
        let j = SMatrix::<f64, 6, 7>::from_row_slice(&[
            0.0, 0.31, 0.0, -0.07, 0.0, 0.21, 0.0, //
            0.31, 0.0, 0.31, 0.0, 0.21, 0.0, 0.0, //
            0.0, -0.31, 0.0, 0.48, 0.0, 0.09, 0.0, //
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
            0.0, 1.0, 0.0, -1.0, 0.0, -1.0, 0.0, //
            1.0, 0.0, 1.0, 0.0, 1.0, 0.0, -0.1,
        ]);
        j.transpose()
    }

    #[test]
    fn test_undamped_pinv_is_left_inverse() {
        let jt = sample_jacobian_t();
        let pinv = damped_pseudo_inverse(&jt, 0.0).unwrap();
        // Jᵀ 列满秩 → pinv(Jᵀ)·Jᵀ = I₆
        assert_relative_eq!(pinv * jt, Matrix6::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_nullspace_projector_annihilates_task_torques() {
        let jt = sample_jacobian_t();
        let pinv = damped_pseudo_inverse(&jt, 0.0).unwrap();
        let projector = SMatrix::<f64, 7, 7>::identity() - jt * pinv;
        // 投影后的力矩不产生任务空间力：pinv(Jᵀ)·P = 0
        assert_relative_eq!(pinv * projector, JacobianTransposePinv::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_damped_pinv_shrinks_singular_values() {
        let jt = sample_jacobian_t();
        let undamped = damped_pseudo_inverse(&jt, 0.0).unwrap();
        let damped = damped_pseudo_inverse(&jt, 0.2).unwrap();
        assert!(damped.norm() < undamped.norm());
    }

    #[test]
    fn test_singular_jacobian_has_no_nan() {
        let jt = JacobianTranspose::zeros();
        let pinv = damped_pseudo_inverse(&jt, 0.0).unwrap();
        assert!(pinv.iter().all(|v| v.is_finite()));
        assert_eq!(pinv, JacobianTransposePinv::zeros());

        // 秩亏的雅可比：只有一个非零列
        let mut jt = JacobianTranspose::zeros();
        jt[(0, 0)] = 2.0;
        let pinv = damped_pseudo_inverse(&jt, 0.0).unwrap();
        assert!(pinv.iter().all(|v| v.is_finite()));
        assert_relative_eq!(pinv[(0, 0)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_saturation_passes_small_changes() {
        let last = JointVector::repeat(1.0);
        let desired = JointVector::from_column_slice(&[1.2, 0.5, 1.0, 1.9, 0.1, 1.99, 1.0]);
        let out = saturate_torque_rate(&desired, &last, 1.0);
        assert_relative_eq!(out, desired, epsilon = 1e-12);
    }

    #[test]
    fn test_saturation_clamps_large_changes() {
        let last = JointVector::from_column_slice(&[0.0, 0.0, 5.0, -5.0, 0.0, 0.0, 0.0]);
        let desired = JointVector::from_column_slice(&[10.0, -10.0, 5.5, -20.0, 0.0, 0.0, 0.0]);
        let out = saturate_torque_rate(&desired, &last, 1.0);
        let expected = JointVector::from_column_slice(&[1.0, -1.0, 5.5, -6.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(out, expected, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_saturation_bounds_change(
            desired in prop::array::uniform7(-100.0f64..100.0),
            last in prop::array::uniform7(-100.0f64..100.0),
            max_delta in 0.01f64..5.0,
        ) {
            let desired = JointVector::from_column_slice(&desired);
            let last = JointVector::from_column_slice(&last);
            let out = saturate_torque_rate(&desired, &last, max_delta);
            for i in 0..JOINT_COUNT {
                let requested = desired[i] - last[i];
                let emitted = out[i] - last[i];
                prop_assert!(emitted.abs() <= max_delta + 1e-9);
                if requested.abs() > max_delta {
                    prop_assert!((emitted - max_delta.copysign(requested)).abs() < 1e-9);
                } else {
                    prop_assert!((out[i] - desired[i]).abs() < 1e-9);
                }
            }
        }
    }
}
