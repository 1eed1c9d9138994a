/// 等待模式对比示例
/// 三个耗时不同的处理器，分别以 WaitForAll / WaitForAny / WaitForNone 发布，观察返回耗时
use async_trait::async_trait;
use evbus::{Event, EventBus, EventHandler, WaitMode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Event)]
struct ReportRequested {
    report: &'static str,
}

struct Sleeper<const MS: u64>;

#[async_trait]
impl<const MS: u64> EventHandler<ReportRequested> for Sleeper<MS> {
    async fn handle(&self, e: &ReportRequested, cancel: &CancellationToken) -> anyhow::Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("{} cancelled after <{MS}ms", e.report),
            _ = tokio::time::sleep(Duration::from_millis(MS)) => {
                println!("  [{MS:>3}ms] rendered {}", e.report);
                Ok(())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let bus = EventBus::builder()
        .handler_instance::<ReportRequested, _>(Arc::new(Sleeper::<300>))
        .handler_instance::<ReportRequested, _>(Arc::new(Sleeper::<100>))
        .handler_instance::<ReportRequested, _>(Arc::new(Sleeper::<200>))
        .build()?;

    for mode in [
        WaitMode::WaitForAll,
        WaitMode::WaitForAny,
        WaitMode::WaitForNone,
    ] {
        println!("{mode}:");
        let started = Instant::now();
        let out = bus
            .publish_with(ReportRequested { report: "q3-sales" }, mode)
            .await?;
        println!("  returned after {:?}: {out:?}", started.elapsed());
        bus.wait_idle().await;
    }

    // 取消信号会传给每个处理器，由处理器自行决定如何结束
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });
    let res = bus
        .publish_cancellable(
            ReportRequested { report: "q4-sales" },
            WaitMode::WaitForAll,
            cancel,
        )
        .await;
    match res {
        Ok(out) => println!("cancelled run -> {out:?}"),
        Err(err) => println!("cancelled run -> {err}"),
    }

    Ok(())
}
