//! 平衡位姿与位姿误差
//!
//! # 四元数双覆盖
//!
//! `q` 与 `-q` 表示同一个旋转。若不处理，相邻两个周期的误差方向
//! 可能因符号翻转而跳变。
//! 因此在求误差（当前 vs 目标）和接收新目标（新目标 vs 旧目标）时，
//! 都先把四元数对齐到同一半球：系数点积为负则取反。

use franka_protocol::PoseTarget;
use nalgebra::{Isometry3, Quaternion, Unit, UnitQuaternion, Vector3, Vector6};
use std::f64::consts::{PI, TAU};

/// 轴向量归一化阈值
const AXIS_NORM_EPSILON: f64 = 1e-12;

/// 笛卡尔位姿（位置 + 单位四元数）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl CartesianPose {
    /// 原点 + 无旋转
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// 由末端变换构造
    pub fn from_isometry(transform: &Isometry3<f64>) -> Self {
        Self {
            position: transform.translation.vector,
            orientation: transform.rotation,
        }
    }

    /// 由入站消息构造（四元数归一化；调用方需先 `validate()`）
    pub fn from_target(target: &PoseTarget) -> Self {
        let [x, y, z, w] = target.orientation;
        Self {
            position: Vector3::from(target.position),
            orientation: UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        }
    }

    /// 位姿误差 `[p - p_d; axis·angle]`，`self` 为当前位姿、`target` 为目标
    pub fn error_to(&self, target: &CartesianPose) -> Vector6<f64> {
        let position_error = self.position - target.position;
        let orientation = align_hemisphere(&self.orientation, &target.orientation);
        // "差" 四元数
        let error_quaternion = orientation * target.orientation.inverse();
        let rotation_error = error_quaternion.scaled_axis();
        Vector6::new(
            position_error.x,
            position_error.y,
            position_error.z,
            rotation_error.x,
            rotation_error.y,
            rotation_error.z,
        )
    }

    /// 一阶低通：`self ← α·target + (1-α)·self`
    ///
    /// 姿态拆成轴和角分别滤波后重建四元数。目标的轴若与当前轴反向，
    /// 先改写为等价的 `(-axis, -angle)`，使两轴同向后再混合。
    /// 任一方为无旋转时沿用另一方的轴。
    pub fn filter_toward(&mut self, target: &CartesianPose, alpha: f64) {
        self.position = target.position * alpha + self.position * (1.0 - alpha);

        let current = axis_angle(&self.orientation);
        let goal = axis_angle(&target.orientation);
        let (axis, angle) = current
            .or(goal.map(|(axis, _)| (axis, 0.0)))
            .unwrap_or((Vector3::x(), 0.0));
        let (mut target_axis, mut target_angle) = goal.unwrap_or((axis, 0.0));
        if axis.dot(&target_axis) < 0.0 {
            target_axis = -target_axis;
            target_angle = -target_angle;
        }
        // 角度差取 [-π, π] 内的等价表示，沿短路径转动
        if target_angle - angle > PI {
            target_angle -= TAU;
        } else if target_angle - angle < -PI {
            target_angle += TAU;
        }
        let axis = target_axis * alpha + axis * (1.0 - alpha);
        let angle = target_angle * alpha + angle * (1.0 - alpha);

        // 两轴同向，混合后的轴长度不小于 1/√2
        self.orientation = match Unit::try_new(axis, AXIS_NORM_EPSILON) {
            Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle),
            None => target.orientation,
        };
    }
}

impl Default for CartesianPose {
    fn default() -> Self {
        Self::identity()
    }
}

/// 将 `q` 对齐到 `reference` 所在半球
#[inline]
pub fn align_hemisphere(
    q: &UnitQuaternion<f64>,
    reference: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    if q.coords.dot(&reference.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-q.into_inner())
    } else {
        *q
    }
}

/// 轴角分解（角在 [0, π]）；无旋转时返回 `None`
fn axis_angle(q: &UnitQuaternion<f64>) -> Option<(Vector3<f64>, f64)> {
    q.axis_angle().map(|(axis, angle)| (axis.into_inner(), angle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn negated(q: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        UnitQuaternion::new_unchecked(-q.into_inner())
    }

    #[test]
    fn test_zero_error_at_target() {
        let pose = CartesianPose::new(
            Vector3::new(0.3, 0.0, 0.4),
            UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3),
        );
        assert_relative_eq!(pose.error_to(&pose), Vector6::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_position_error_sign() {
        let current = CartesianPose::new(Vector3::new(0.5, 0.0, 0.4), UnitQuaternion::identity());
        let target = CartesianPose::new(Vector3::new(0.3, 0.1, 0.4), UnitQuaternion::identity());
        let e = current.error_to(&target);
        assert_relative_eq!(
            e.fixed_rows::<3>(0).into_owned(),
            Vector3::new(0.2, -0.1, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rotation_error_is_axis_times_angle() {
        let current = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let target = CartesianPose::identity();
        let e = current.error_to(&target);
        assert_relative_eq!(
            e.fixed_rows::<3>(3).into_owned(),
            Vector3::new(0.0, 0.0, FRAC_PI_2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_double_cover_sign_invariance() {
        let target = CartesianPose::new(
            Vector3::new(0.4, -0.1, 0.5),
            UnitQuaternion::from_euler_angles(3.0, 0.2, -1.0),
        );
        let q = UnitQuaternion::from_euler_angles(-3.0, 0.1, 0.7);
        let current = CartesianPose::new(Vector3::new(0.45, 0.0, 0.5), q);
        let flipped = CartesianPose::new(current.position, negated(&q));

        assert_relative_eq!(current.error_to(&target), flipped.error_to(&target), epsilon = 1e-12);
    }

    #[test]
    fn test_align_hemisphere() {
        let q = UnitQuaternion::from_euler_angles(0.3, 0.2, 0.1);
        let aligned = align_hemisphere(&negated(&q), &q);
        assert_relative_eq!(aligned.coords, q.coords, epsilon = 1e-15);
        assert_eq!(align_hemisphere(&q, &q), q);
    }

    #[test]
    fn test_from_target_normalizes() {
        let target = PoseTarget::new([0.3, 0.0, 0.4], [0.0, 0.0, 0.0, 2.0]);
        let pose = CartesianPose::from_target(&target);
        assert_relative_eq!(pose.orientation, UnitQuaternion::identity(), epsilon = 1e-12);
        assert_eq!(pose.position, Vector3::new(0.3, 0.0, 0.4));
    }

    #[test]
    fn test_position_filter_geometric_convergence() {
        let alpha = 0.1;
        let target = CartesianPose::new(Vector3::new(0.3, 0.0, 0.4), UnitQuaternion::identity());
        let mut pose = CartesianPose::identity();
        let mut residual = (target.position - pose.position).norm();
        for _ in 0..20 {
            pose.filter_toward(&target, alpha);
            let next = (target.position - pose.position).norm();
            assert_relative_eq!(next, residual * (1.0 - alpha), epsilon = 1e-12);
            residual = next;
        }
    }

    #[test]
    fn test_orientation_filter_converges() {
        let target = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.8),
        );
        let mut pose = CartesianPose::identity();
        for _ in 0..500 {
            pose.filter_toward(&target, 0.05);
        }
        assert!(pose.orientation.angle_to(&target.orientation) < 1e-6);
    }

    #[test]
    fn test_filter_alpha_one_jumps_to_target() {
        let target = CartesianPose::new(
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4),
        );
        let mut pose = CartesianPose::identity();
        pose.filter_toward(&target, 1.0);
        assert_relative_eq!(pose.position, target.position, epsilon = 1e-12);
        assert!(pose.orientation.angle_to(&target.orientation) < 1e-12);
    }

    #[test]
    fn test_orientation_filter_crosses_zero_angle() {
        // 绕 z 轴从 +0.1 到 -0.1：两者的轴角分解轴相反
        let mut pose = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.1),
        );
        let target = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -0.1),
        );

        let mut gap = pose.orientation.angle_to(&target.orientation);
        for _ in 0..1000 {
            pose.filter_toward(&target, 0.05);
            let next = pose.orientation.angle_to(&target.orientation);
            assert!(next <= gap + 1e-12, "gap grew: {} -> {}", gap, next);
            gap = next;
        }
        assert!(gap < 1e-9);
    }

    #[test]
    fn test_orientation_filter_from_identity_to_negative_axis() {
        let target = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Unit::new_normalize(-Vector3::x()), 0.5),
        );
        let mut pose = CartesianPose::identity();

        pose.filter_toward(&target, 0.1);
        // 第一步即沿目标方向移动 α 倍角度
        let expected = UnitQuaternion::from_axis_angle(&Unit::new_normalize(-Vector3::x()), 0.05);
        assert!(pose.orientation.angle_to(&expected) < 1e-12);

        for _ in 0..300 {
            pose.filter_toward(&target, 0.1);
        }
        assert!(pose.orientation.angle_to(&target.orientation) < 1e-9);
    }

    #[test]
    fn test_orientation_filter_near_half_turn() {
        // 末端朝下（绕 x 接近 π），目标跨过 π 到另一侧
        let mut pose = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI - 0.05),
        );
        let target = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI + 0.05),
        );
        // 两者相距 0.1 rad，滤波走短路径，距离单调收敛
        let mut gap = pose.orientation.angle_to(&target.orientation);
        assert_relative_eq!(gap, 0.1, epsilon = 1e-9);
        for _ in 0..2000 {
            pose.filter_toward(&target, 0.01);
            let next = pose.orientation.angle_to(&target.orientation);
            assert!(next <= gap + 1e-12, "gap grew: {} -> {}", gap, next);
            gap = next;
        }
        assert!(gap < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_double_cover_sign_invariance(
            r1 in -3.1f64..3.1, p1 in -1.5f64..1.5, y1 in -3.1f64..3.1,
            r2 in -3.1f64..3.1, p2 in -1.5f64..1.5, y2 in -3.1f64..3.1,
        ) {
            let target =
                CartesianPose::new(Vector3::zeros(), UnitQuaternion::from_euler_angles(r1, p1, y1));
            let q = UnitQuaternion::from_euler_angles(r2, p2, y2);
            let a = CartesianPose::new(Vector3::zeros(), q).error_to(&target);
            let b = CartesianPose::new(Vector3::zeros(), negated(&q)).error_to(&target);
            prop_assert!((a - b).norm() < 1e-9);
        }
    }
}
