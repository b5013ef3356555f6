//! 事件循环驱动
//!
//! 单个 tokio 任务：从通道接收地图事件，并在两次事件之间
//! 睡眠到控制器的下一个截止时间。通道关闭后继续触发剩余计时器，
//! 直到没有待处理的截止时间为止。

use crate::controller::SelectionController;
use crate::map_engine::{MapEngine, MapEvent};
use crate::page::PageHost;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

async fn wait_for(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(Instant::from_std(d)).await,
        None => std::future::pending().await,
    }
}

pub async fn run<M: MapEngine, P: PageHost>(
    controller: &mut SelectionController<M, P>,
    mut events: mpsc::UnboundedReceiver<MapEvent>,
) {
    loop {
        let deadline = controller.next_deadline();
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => controller.handle_event(event, Instant::now().into_std()),
                None => break,
            },
            _ = wait_for(deadline) => controller.poll_timers(Instant::now().into_std()),
        }
    }

    debug!("event channel closed, draining timers");
    while let Some(deadline) = controller.next_deadline() {
        tokio::time::sleep_until(Instant::from_std(deadline)).await;
        controller.poll_timers(Instant::now().into_std());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::controller::ControllerState;
    use crate::memory_map::fixtures::*;
    use crate::memory_map::MemoryMap;
    use crate::page::MemoryPage;
    use std::time::Duration;

    fn controller() -> SelectionController<MemoryMap, MemoryPage> {
        let map = with_features(
            map_at(-77.572, 43.025, 14.88),
            vec![park("P1", "Durand", -77.572, 43.025, 0.002)],
        );
        SelectionController::new(AppConfig::default(), map, MemoryPage::new(), None).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_handshake_after_close() {
        let mut c = controller();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(MapEvent::Loaded).unwrap();
        drop(tx);

        run(&mut c, rx).await;
        assert_eq!(c.state(), ControllerState::Ready);
        assert_eq!(c.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tap_then_render_burst() {
        let mut c = controller();
        let center = c.map().project(ll(-77.572, 43.025));
        let (tx, rx) = mpsc::unbounded_channel();

        let producer = async move {
            tx.send(MapEvent::Loaded).unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            tx.send(MapEvent::Click(center)).unwrap();
            for _ in 0..5 {
                tx.send(MapEvent::Render).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::join!(run(&mut c, rx), producer);

        assert_eq!(c.state(), ControllerState::Ready);
        assert_eq!(c.selection().entity_id.as_deref(), Some("P1"));
        // 构造 + 点击 + 一次去抖后的视口同步
        assert_eq!(c.page().history.len(), 3);
        assert_eq!(c.next_deadline(), None);
    }
}
