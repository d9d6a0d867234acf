use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use form_prep::utils::logging::init_tracing;
use form_prep::{App, Config, ModelSize};

/// 为 PDF 表单检测并生成可填写字段
#[derive(Debug, Parser)]
#[command(name = "form-prep", version, about)]
struct Cli {
    /// 待处理的 PDF 文件
    file: PathBuf,

    /// 配置文件路径（默认读取当前目录的 form_prep.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 检测模型: small | large
    #[arg(short, long)]
    model: Option<ModelSize>,

    /// 灵敏度 1-5
    #[arg(short, long)]
    sensitivity: Option<u8>,

    /// 检测签名字段
    #[arg(long)]
    signature_fields: bool,

    /// 保留文档中已有的字段
    #[arg(long)]
    keep_existing_fields: bool,

    /// 结果输出目录
    #[arg(short, long)]
    output_dir: Option<String>,

    /// 显示详细日志
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖配置
    fn apply(&self, config: &mut Config) {
        if let Some(model) = self.model {
            config.preparation.model = model;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.preparation.sensitivity = sensitivity;
        }
        if self.signature_fields {
            config.preparation.use_signature_fields = true;
        }
        if self.keep_existing_fields {
            config.preparation.keep_existing_fields = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.verbose {
            config.verbose_logging = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // 初始化日志
    init_tracing(config.verbose_logging);

    // 初始化并运行应用
    let report = App::initialize(config)?.run(&cli.file).await?;
    if !report.succeeded() {
        bail!("任务未成功完成: {}", report.snapshot);
    }

    Ok(())
}
