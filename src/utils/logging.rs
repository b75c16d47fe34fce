/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志（`RUST_LOG` 可覆盖，默认 info）
///
/// 重复调用不会报错，测试中可以随意调用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `mode`: 运行模式描述
/// - `max_parallel`: 最大并发数
pub fn log_startup(mode: &str, max_parallel: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!("📊 最大并发数: {}", max_parallel);
    info!(
        "🕐 启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `name`: 批次名称（查询或 profile）
/// - `total`: 工作项总数
pub fn log_batch_start(name: &str, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理: {}", name);
    info!("📄 共 {} 项", total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(name: &str, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ {} 完成: 成功 {}/{}", name, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 写出的行数
/// - `total`: 输入项总数
/// - `output_path`: 输出文件路径
pub fn print_final_stats(success: usize, total: usize, output_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 丢弃: {}", total.saturating_sub(success));
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 测试用日志捕获：在当前线程安装一个写入内存的 subscriber
#[cfg(test)]
pub(crate) mod capture {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing::subscriber::DefaultGuard;

    #[derive(Clone, Default)]
    pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        /// 仅对当前线程生效，配合 current_thread 运行时使用
        pub(crate) fn start() -> (Self, DefaultGuard) {
            let capture = Self::default();
            let writer = capture.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .with_writer(move || writer.clone())
                .finish();
            (capture, tracing::subscriber::set_default(subscriber))
        }

        /// 指定级别的日志行
        pub(crate) fn lines_at(&self, level: &str) -> Vec<String> {
            let raw = self.0.lock().unwrap();
            String::from_utf8_lossy(&raw)
                .lines()
                .filter(|line| line.split_whitespace().any(|word| word == level))
                .map(str::to_string)
                .collect()
        }
    }
}
