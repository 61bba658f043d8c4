use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use qmlrc::app_settings::AppSettings;
use qmlrc::converter;
use qmlrc::error::{AppError, AppResult};
use qmlrc::logger;
use qmlrc::{QrcVariant, SynthesisOptions};

/// 命令行参数，未指定的选项使用配置文件中的值。
#[derive(Parser, Debug)]
#[command(
    version,
    about = "将 QQ 音乐逐字歌词及其翻译、罗马音合并转换为 LRC 文件",
    long_about = "输入可以是 {lyric, trans, roma} 形式的 JSON、QQ 音乐歌词接口的响应，\n或者配合 --encrypted 使用的加密歌词文件。每个输入会在输出目录中生成同名的 .lrc 文件。"
)]
struct CliArgs {
    /// 输入文件，可以指定多个
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 不输出罗马音
    #[arg(long)]
    no_roma: bool,

    /// 不输出翻译
    #[arg(long)]
    no_trans: bool,

    /// 输出目录
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// 输入为加密歌词文件 (cloud: 十六进制文本, local: 本地 .qrc 文件)
    #[arg(long, value_name = "VARIANT")]
    encrypted: Option<QrcVariant>,

    /// 把本次的输出选项写回配置文件
    #[arg(long)]
    save_config: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let (mut settings, notices) = AppSettings::load_deferred();
    logger::init_logger(&settings.log_settings, args.verbose);
    for notice in &notices {
        notice.emit();
    }

    apply_overrides(&mut settings, &args);

    match run(&args, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn apply_overrides(settings: &mut AppSettings, args: &CliArgs) {
    let output = &mut settings.output_settings;
    if args.no_roma {
        output.include_romanization = false;
    }
    if args.no_trans {
        output.include_translation = false;
    }
    if let Some(dir) = &args.output_dir {
        output.output_dir.clone_from(dir);
    }
}

fn run(args: &CliArgs, settings: &AppSettings) -> AppResult<()> {
    if args.save_config {
        settings.save()?;
        log::info!("输出选项已写入配置文件。");
    }

    let options = SynthesisOptions {
        include_romanization: settings.output_settings.include_romanization,
        include_translation: settings.output_settings.include_translation,
    };
    let output_dir = &settings.output_settings.output_dir;

    let total = args.inputs.len();
    let mut failed = 0usize;
    for input in &args.inputs {
        if let Err(e) = convert_one(input, output_dir, args.encrypted, &options) {
            log::error!("[转换] {} 转换失败: {e}", input.display());
            failed += 1;
        }
    }

    log::info!("完成: 成功 {} 个, 失败 {failed} 个。", total - failed);
    if failed > 0 {
        return Err(AppError::BatchFailed { failed, total });
    }
    Ok(())
}

fn convert_one(
    input: &Path,
    output_dir: &Path,
    encrypted: Option<QrcVariant>,
    options: &SynthesisOptions,
) -> AppResult<PathBuf> {
    if !input.is_file() {
        return Err(AppError::MissingInput(input.to_path_buf()));
    }

    let output = match encrypted {
        Some(variant) => converter::convert_encrypted_file(input, variant, output_dir, options)?,
        None => converter::convert_json_file(input, output_dir, options)?,
    };
    Ok(output)
}
