/// 订单事件示例
/// 展示单例处理器的两种注册方式、依赖解析，以及三种等待模式下的发布结果
use async_trait::async_trait;
use evbus::{
    BusError, DependencyResolver, Event, EventBus, EventBusConfig, EventHandler, FromResolver,
    PublishExt, SingletonContainer, WaitMode,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ============================================================================
// 事件
// ============================================================================

#[derive(Debug, Clone, Event)]
#[event(name = "order.created")]
struct OrderCreated {
    id: String,
    amount_cents: u64,
}

// ============================================================================
// 进程级依赖
// ============================================================================

#[derive(Default)]
struct OrderLedger {
    rows: Mutex<Vec<String>>,
}

impl OrderLedger {
    fn append(&self, row: String) {
        self.rows.lock().unwrap().push(row);
    }

    fn rows(&self) -> Vec<String> {
        self.rows.lock().unwrap().clone()
    }
}

struct SmtpSettings {
    relay: String,
}

// ============================================================================
// 处理器
// ============================================================================

/// 记账：通过依赖解析器拿到共享账本
struct LedgerProjection {
    ledger: Arc<OrderLedger>,
}

impl FromResolver for LedgerProjection {
    fn construct(resolver: &dyn DependencyResolver) -> anyhow::Result<Self> {
        Ok(Self {
            ledger: resolver.resolve::<OrderLedger>()?,
        })
    }
}

#[async_trait]
impl EventHandler<OrderCreated> for LedgerProjection {
    async fn handle(&self, e: &OrderCreated, _cancel: &CancellationToken) -> anyhow::Result<()> {
        self.ledger.append(format!("{} {}", e.id, e.amount_cents));
        Ok(())
    }
}

/// 发送确认邮件：较慢，遇到大额订单时失败
struct ConfirmationMailer {
    relay: String,
}

impl FromResolver for ConfirmationMailer {
    fn construct(resolver: &dyn DependencyResolver) -> anyhow::Result<Self> {
        let settings = resolver.resolve::<SmtpSettings>()?;
        Ok(Self {
            relay: settings.relay.clone(),
        })
    }
}

#[async_trait]
impl EventHandler<OrderCreated> for ConfirmationMailer {
    async fn handle(&self, e: &OrderCreated, cancel: &CancellationToken) -> anyhow::Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("mail for {} cancelled", e.id),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        if e.amount_cents > 1_000_000 {
            anyhow::bail!(
                "relay {} rejected order {}: amount needs review",
                self.relay,
                e.id
            );
        }
        tracing::info!(order = %e.id, relay = %self.relay, "confirmation sent");
        Ok(())
    }
}

/// 已构造好的实例也可以直接注册
struct Metrics {
    seen: Mutex<u64>,
}

#[async_trait]
impl EventHandler<OrderCreated> for Metrics {
    async fn handle(&self, _e: &OrderCreated, _cancel: &CancellationToken) -> anyhow::Result<()> {
        *self.seen.lock().unwrap() += 1;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,evbus=debug")),
        )
        .init();

    let ledger = Arc::new(OrderLedger::default());
    let container = SingletonContainer::new();
    container
        .insert(ledger.clone())
        .insert(Arc::new(SmtpSettings {
            relay: "smtp.internal:25".into(),
        }));

    let metrics = Arc::new(Metrics {
        seen: Mutex::new(0),
    });

    let bus = EventBus::builder()
        .config(EventBusConfig::builder().eager_construction(true).build())
        .resolver(Arc::new(container))
        .handler::<OrderCreated, LedgerProjection>()
        .handler::<OrderCreated, ConfirmationMailer>()
        .handler_instance::<OrderCreated, _>(metrics.clone())
        .build()?;

    // WaitForAll：全部成功
    let out = bus
        .publish_with(
            OrderCreated {
                id: "X1".into(),
                amount_cents: 4_200,
            },
            WaitMode::WaitForAll,
        )
        .await?;
    println!("X1 -> {out:?}");

    // WaitForAll：邮件失败，但记账与计数照常完成
    let large = OrderCreated {
        id: "X2".into(),
        amount_cents: 5_000_000,
    };
    match large.publish_to(&bus).await {
        Err(BusError::HandlersFailed { failures, .. }) => {
            for f in failures {
                println!("X2 failed in {}: {:#}", f.handler, f.error);
            }
        }
        other => println!("X2 -> {other:?}"),
    }

    // WaitForAny：最快的处理器完成即返回
    let out = evbus::publish(
        &bus,
        OrderCreated {
            id: "X3".into(),
            amount_cents: 100,
        },
        WaitMode::WaitForAny,
    )
    .await?;
    println!("X3 -> {out:?}");

    // WaitForNone：立即返回，失败只出现在日志中
    let out = bus
        .publish_with(
            OrderCreated {
                id: "X4".into(),
                amount_cents: 9_000_000,
            },
            WaitMode::WaitForNone,
        )
        .await?;
    println!("X4 -> {out:?}");

    bus.wait_idle().await;
    println!("ledger: {:?}", ledger.rows());
    println!("metrics: {}", *metrics.seen.lock().unwrap());
    Ok(())
}
