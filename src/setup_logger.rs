use crate::error::InitProcessError;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// 標準出力とログファイルの両方に書き込む
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

pub fn setup_logger(log_file: Option<&Path>) -> Result<(), InitProcessError> {
    let mut builder = Builder::new();

    builder
        // ログレベルの設定 (RUST_LOG があればそちらを優先)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        // タイムスタンプ付きのフォーマット
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| InitProcessError::LoggerError(format!("{}: {}", path.display(), e)))?;
            builder.target(Target::Pipe(Box::new(Tee { file })));
        }
        None => {
            builder.target(Target::Stdout);
        }
    }

    builder
        .try_init()
        .map_err(|e| InitProcessError::LoggerError(e.to_string()))
}
