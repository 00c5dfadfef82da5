use super::{OcrItem, Recognize};
use crate::{Error, Result};
use image::DynamicImage;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

struct Job {
    image: DynamicImage,
    reply: oneshot::Sender<Result<Vec<OcrItem>>>,
}

/// Handle to a dedicated thread that owns a loaded OCR engine.
///
/// The engine is constructed on the worker thread, so it does not need to be
/// `Send`. Jobs are processed one at a time in submission order.
#[derive(Clone)]
pub struct OcrWorker {
    tx: mpsc::UnboundedSender<Job>,
}

impl OcrWorker {
    /// Spawn the worker and wait until `load` has produced an engine.
    pub async fn start<R, F>(load: F) -> Result<Self>
    where
        R: Recognize + 'static,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        std::thread::Builder::new()
            .name("ocr-worker".into())
            .spawn(move || {
                let started = Instant::now();
                let engine = match load() {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                info!("OCR model loaded in {}ms", started.elapsed().as_millis());

                while let Some(job) = rx.blocking_recv() {
                    let started = Instant::now();
                    let result = engine.recognize(&job.image);
                    debug!(
                        "recognized {}x{} image in {}ms",
                        job.image.width(),
                        job.image.height(),
                        started.elapsed().as_millis()
                    );
                    let _ = job.reply.send(result);
                }
                debug!("OCR worker shutting down");
            })?;

        ready_rx
            .await
            .map_err(|_| Error::Ocr("OCR worker exited during startup".into()))??;
        Ok(Self { tx })
    }

    /// Recognize all text in `image`.
    pub async fn recognize(&self, image: DynamicImage) -> Result<Vec<OcrItem>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job { image, reply })
            .map_err(|_| Error::Ocr("OCR worker is not running".into()))?;
        rx.await
            .map_err(|_| Error::Ocr("OCR worker dropped the request".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<OcrItem>);

    impl Recognize for Fixed {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrItem>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let items = vec![OcrItem::from_rect("Login", 0, 0, 40, 20, 0.99)];
        let expected = items.clone();
        let worker = OcrWorker::start(move || Ok(Fixed(items))).await.unwrap();

        let out = worker.recognize(DynamicImage::new_rgb8(8, 8)).await.unwrap();
        assert_eq!(out, expected);

        // clones share the same thread
        let other = worker.clone();
        assert_eq!(other.recognize(DynamicImage::new_rgb8(8, 8)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_worker_load_failure() {
        let result = OcrWorker::start(|| -> Result<Fixed> {
            Err(Error::Ocr("missing model".into()))
        })
        .await;
        let err = result.err().unwrap();
        assert!(err.to_string().contains("missing model"));
    }
}
