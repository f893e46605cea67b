use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use noir_frame::descriptor::ImageDescriptor;
use noir_frame::error::Result;
use noir_frame::events::{Command, Navigation, ViewerEvent};
use noir_frame::pipeline;
use noir_frame::preferences::{Preferences, Toggle};
use noir_frame::storage::Storage;
use noir_frame::tasks::loader::ImageSource;
use noir_frame::tasks::manager::ManagerOptions;
use noir_frame::tasks::search::SearchBackend;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct Catalog {
    len: usize,
}

impl SearchBackend for Catalog {
    fn search(
        &self,
        _expression: &str,
        _record: bool,
    ) -> impl Future<Output = Result<Vec<ImageDescriptor>>> + Send {
        let items = (0..self.len)
            .map(|i| ImageDescriptor::new(format!("/p/{i:03}.png"), "png"))
            .collect();
        async move { Ok(items) }
    }

    fn refine_with_tag(
        &self,
        expression: &str,
        tag: &str,
    ) -> impl Future<Output = Result<String>> + Send {
        let refined = format!("#{tag} and {expression}");
        async move { Ok(refined) }
    }
}

/// Serves the same small PNG for every URL after a fixed delay.
#[derive(Clone)]
struct SlowImages {
    delay: Duration,
    png: Arc<Vec<u8>>,
}

impl SlowImages {
    fn new(delay: Duration) -> Self {
        let mut out = Cursor::new(Vec::new());
        image::RgbaImage::new(2, 2)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        Self {
            delay,
            png: Arc::new(out.into_inner()),
        }
    }
}

impl ImageSource for SlowImages {
    fn fetch(&self, _url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let (delay, png) = (self.delay, self.png.clone());
        async move {
            tokio::time::sleep(delay).await;
            Ok(png.to_vec())
        }
    }
}

fn preferences() -> Preferences {
    let mut prefs = Preferences::load(Storage::in_memory());
    prefs.set(Toggle::Shuffle, false).unwrap();
    prefs.set(Toggle::Random, false).unwrap();
    prefs.set(Toggle::Position, true).unwrap();
    prefs.set_update_interval(0).unwrap();
    prefs
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn navigation_burst_keeps_flowing_with_slow_images() {
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    let pipeline::Endpoints {
        commands,
        mut viewer,
    } = pipeline::spawn(
        &mut tasks,
        preferences(),
        ManagerOptions {
            endpoint: "http://noir.test".into(),
            max_load_retries: 100,
            seed: Some(3),
        },
        Catalog { len: 50 },
        SlowImages::new(Duration::from_millis(20)),
        4,
        &cancel,
    );

    // stands in for the viewer: drain events, report shown positions
    let (shown_tx, mut shown) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = viewer.recv().await {
            if let ViewerEvent::Show(frame) = event {
                let _ = shown_tx.send((frame.position, frame.descriptor.path().to_string()));
            }
        }
    });
    let first = tokio::time::timeout(Duration::from_secs(5), shown.recv())
        .await
        .expect("startup frame never shown")
        .unwrap();
    assert_eq!(first.0, Some(0));

    // pairs of moves cancel out, so the burst ends where it started
    for i in 0..2000 {
        let nav = if i % 2 == 0 {
            Navigation::Forward(1)
        } else {
            Navigation::Backward(1)
        };
        tokio::time::timeout(Duration::from_secs(5), commands.send(Command::Navigate(nav)))
            .await
            .unwrap_or_else(|_| panic!("command {i} not accepted"))
            .unwrap();
    }
    commands
        .send(Command::Navigate(Navigation::Forward(3)))
        .await
        .unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some((position, path)) = shown.recv().await {
            if position == Some(3) {
                return path;
            }
        }
        panic!("viewer closed before the final frame");
    })
    .await
    .expect("final frame never shown");
    assert_eq!(settled, "/p/003.png");

    cancel.cancel();
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }
}
