//! 种子评分策略的消融实验: 在同一个合成体模上运行每个策略的完整自动流程.

mod phantom;
mod profile;
mod result;
mod runner;

use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init()
        .unwrap();
    runner::run().analyze();
}
