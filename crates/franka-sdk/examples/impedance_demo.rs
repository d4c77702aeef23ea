//! 阻抗控制 + 模式监督演示（mock 硬件）
//!
//! - 控制线程：1kHz 运行笛卡尔阻抗控制器
//! - 消息线程：沿 x 方向发布一条缓慢移动的目标位姿，中途调高刚度
//! - 监督器：发送一次力矩模式命令，之后停止发送，由看门狗回退到默认控制器
//!
//! 运行：
//! ```bash
//! RUST_LOG=debug cargo run -p franka-sdk --example impedance_demo --features mock
//! ```

use franka_driver::mock::{MockArm, MockHardware, MockSwitcher};
use franka_driver::{Jacobian, JointVector};
use franka_sdk::control::supervisor::DEFAULT_CONTROLLER_NAME;
use franka_sdk::prelude::*;
use nalgebra::Isometry3;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

fn demo_jacobian() -> Jacobian {
    let mut j = Jacobian::zeros();
    for i in 0..6 {
        j[(i, i)] = 1.0;
    }
    j
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    franka_sdk::init_logger!();

    println!("🎯 Franka Impedance Demo (mock hardware)\n");

    let config = ArmConfig::default();
    let arm = Arc::new(MockArm::new(RobotSnapshot::at_rest(
        JointVector::zeros(),
        demo_jacobian(),
        Isometry3::translation(0.4, 0.0, 0.4),
    )));
    let hardware = MockHardware::new(&config.arm_id, Arc::clone(&arm), &config.joint_names);

    // 1. 监督器 + 看门狗
    let switcher = MockSwitcher::with_active(
        config
            .controllers
            .default_controller
            .as_deref()
            .unwrap_or(DEFAULT_CONTROLLER_NAME),
    );
    let (supervisor, watchdog) = start_supervisor(&config.controllers, switcher.clone())?;
    supervisor.handle_command(&ModeCommand::from(JointCommandMode::Torque))?;
    println!("✅ Active controller: {}", supervisor.current_controller());

    // 2. 阻抗控制器
    let mut controller = CartesianImpedanceController::init(&hardware, &config)?;
    let handle = controller.handle();
    let stop = AtomicBool::new(false);
    let loop_config = LoopConfig {
        max_iterations: Some(1000),
        ..LoopConfig::from_rate(config.impedance.control_rate_hz)
    };

    let stats = thread::scope(|s| {
        let control = s.spawn(|| run_controller(&mut controller, &loop_config, &stop));

        s.spawn(|| {
            for step in 0..50 {
                let x = 0.4 + 0.001 * step as f64;
                if let Err(e) = handle.apply_pose(&PoseTarget::from_position([x, 0.0, 0.4])) {
                    eprintln!("⚠️  Pose rejected: {}", e);
                }
                if step == 25 {
                    let message = StiffnessMessage {
                        use_flag: 0,
                        diagonal_stiffness: [400.0, 400.0, 400.0, 40.0, 40.0, 40.0],
                        // 哨兵值 -1.0：按临界阻尼推导
                        diagonal_damping: [-1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                        ..Default::default()
                    };
                    if let Err(e) = handle.apply_stiffness_message(message) {
                        eprintln!("⚠️  Stiffness rejected: {}", e);
                    }
                }
                thread::sleep(Duration::from_millis(10));
            }
        });

        control.join()
    });

    let stats = match stats {
        Ok(result) => result?,
        Err(_) => return Err("control thread panicked".into()),
    };

    println!("\n📊 Loop stats:");
    println!("   iterations: {}", stats.iterations);
    println!("   overruns:   {}", stats.overruns);
    println!("   max period: {:?}", stats.max_period);

    let pose = controller.current_pose();
    let gains = controller.current_gains();
    println!("\n📍 Filtered target position: {:?}", pose.position.as_slice());
    println!("   Filtered stiffness (x): {:.1}", gains.stiffness[(0, 0)]);
    println!("   Last torque command: {:?}", arm.commanded().as_slice());

    // 3. 命令流已中断：看门狗早已回退
    println!("\n🛡️  Controller after command timeout: {}", supervisor.current_controller());
    let fallbacks = watchdog.shutdown();
    println!("   Watchdog fallbacks: {}", fallbacks);
    println!("   Switch requests: {}", switcher.request_count());

    Ok(())
}
