use log::warn;
use std::future::Future;
use std::io;

/// `run` の完了か終了シグナルの受信を待つ
///
/// シグナルを受信した場合は `None` を返す。シグナルの待機に失敗した場合は警告を出し、
/// `run` が完了するまで待ち続ける。
pub async fn until_signal<F, S>(run: F, signal: S) -> Option<F::Output>
where
    F: Future,
    S: Future<Output = io::Result<()>>,
{
    tokio::pin!(run);

    tokio::select! {
        output = &mut run => Some(output),
        received = signal => match received {
            Ok(()) => None,
            Err(e) => {
                warn!("シグナルハンドラを登録できません: {}。ブリッジの終了を待ちます", e);
                Some(run.await)
            }
        },
    }
}
