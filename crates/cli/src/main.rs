use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use camstream::mjpeg::buffer::DEFAULT_CAPACITY;
use camstream::playback::{PlaybackSource, StreamCatalog, fetch_snapshot};
use camstream::{
    HttpMjpegReader, MjpegReader, PlaybackAction, PlaybackConfig, PlaybackCoordinator,
    PlaybackState, ReaderConfig, Result, StreamError,
};
use clap::Parser;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "camstream",
    about = "Record JPEG frames from an MJPEG camera stream"
)]
struct Args {
    /// MJPEG stream URL
    #[arg(long, required_unless_present = "address", conflicts_with = "address")]
    url: Option<String>,

    /// Camera address (host[:port]) serving the stream catalog
    #[arg(long, short)]
    address: Option<String>,

    /// Stream name in the catalog (default: the first stream)
    #[arg(long, short, requires = "address")]
    stream: Option<String>,

    /// Directory the frames are written to
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Largest frame accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Reconnect when the stream ends, stalls or fails
    #[arg(long)]
    retry: bool,

    /// Save one snapshot picture from the catalog and exit
    #[arg(long, requires = "address")]
    snapshot: bool,

    /// Seconds without a frame before the stream counts as stalled
    #[arg(long, default_value_t = 5)]
    stall_secs: u64,
}

/// How a stream session ended.
enum SessionEnd {
    /// `--max-frames` reached.
    Limit,
    /// The watchdog gave up waiting for data.
    TimedOut,
    Finished { cancelled: bool },
}

type SharedCoordinator = Arc<Mutex<PlaybackCoordinator>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted");
            ctrl_c.cancel();
        }
    });

    if let Err(e) = run(&args, &shutdown).await {
        eprintln!("camstream: {}", e);
        std::process::exit(1);
    }
}

/// Where stream URLs come from.
#[derive(Debug)]
enum Origin {
    /// `--url`: one fixed stream, named by its URL.
    Url(String),
    /// `--address`: the camera catalog, queried again for every session.
    Catalog(String),
}

impl Origin {
    async fn stream_url(&self, stream: &str) -> Result<String> {
        match self {
            Self::Url(url) => Ok(url.clone()),
            Self::Catalog(address) => {
                let catalog = StreamCatalog::fetch(address).await?;
                resolve_stream(&catalog, stream)
            }
        }
    }
}

async fn run(args: &Args, shutdown: &CancellationToken) -> Result<()> {
    tokio::fs::create_dir_all(&args.output).await?;

    let (origin, stream) = match (&args.url, &args.address) {
        (Some(url), _) => (Origin::Url(url.clone()), url.clone()),
        (None, Some(address)) => {
            let catalog = StreamCatalog::fetch(address).await?;
            if args.snapshot {
                return save_snapshot(&catalog, &args.output).await;
            }
            let stream = match &args.stream {
                Some(name) => name.clone(),
                None => first_stream(&catalog)?,
            };
            (Origin::Catalog(address.clone()), stream)
        }
        (None, None) => return Err(StreamError::InvalidUrl(String::new())),
    };

    let coordinator: SharedCoordinator = Arc::new(Mutex::new(PlaybackCoordinator::new(
        PlaybackConfig::default(),
    )));
    let mut stream = coordinator.lock().play(Some(&stream), Instant::now())?;
    let mut written = 0u64;

    while !shutdown.is_cancelled() {
        let end = match origin.stream_url(&stream).await {
            Ok(url) => record(&url, args, &coordinator, shutdown, &mut written).await,
            Err(err) => Err(err),
        };

        let now = Instant::now();
        let action = match end {
            Ok(SessionEnd::Limit) => {
                tracing::info!(frames = written, "frame limit reached");
                break;
            }
            Ok(SessionEnd::TimedOut) => Some(PlaybackAction::Restart),
            Ok(SessionEnd::Finished { cancelled }) => {
                coordinator.lock().stream_finished(cancelled, now)
            }
            Err(err) if !args.retry => return Err(err),
            Err(err) => coordinator.lock().fail(&err, now),
        };

        if !args.retry {
            break;
        }

        match action {
            Some(PlaybackAction::Retry { after }) => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(after) => {}
                }
            }
            Some(PlaybackAction::Restart) => {}
            None => break,
        }

        let next = coordinator.lock().resume(Instant::now());
        match next {
            Some(next) => stream = next,
            None => break,
        }
    }

    tracing::info!(frames = written, output = %args.output.display(), "done");
    Ok(())
}

fn first_stream(catalog: &StreamCatalog) -> Result<String> {
    catalog
        .streams()
        .first()
        .map(|s| s.name.clone())
        .ok_or_else(|| StreamError::UnknownStream(String::new()))
}

/// Pick the MJPEG URL of a catalog stream.
fn resolve_stream(catalog: &StreamCatalog, stream: &str) -> Result<String> {
    match catalog.select(stream)? {
        PlaybackSource::Mjpeg(url) => Ok(url),
        PlaybackSource::Mp4(url) => {
            tracing::warn!(stream, %url, "stream is MP4 only");
            Err(StreamError::NoPlayableSource(stream.to_string()))
        }
    }
}

async fn save_snapshot(catalog: &StreamCatalog, output: &Path) -> Result<()> {
    let Some(frame) = fetch_snapshot(catalog).await? else {
        tracing::warn!("camera offers no snapshot");
        return Ok(());
    };

    let path = output.join("snapshot.jpg");
    tokio::fs::write(&path, &frame.data).await?;
    tracing::info!(path = %path.display(), size = frame.data.len(), "snapshot saved");
    Ok(())
}

/// One stream session: connect, write frames until the stream ends.
async fn record(
    url: &str,
    args: &Args,
    coordinator: &SharedCoordinator,
    shutdown: &CancellationToken,
    written: &mut u64,
) -> Result<SessionEnd> {
    let config = ReaderConfig {
        capacity: args.capacity,
    };
    let mut reader = MjpegReader::fetch(url, &config).await?;
    tracing::info!(url, "recording");

    let session = reader.cancellation_token();
    let watchdog = tokio::spawn(watchdog(
        coordinator.clone(),
        session.clone(),
        shutdown.clone(),
        Duration::from_secs(args.stall_secs.max(1)),
    ));

    let end = write_frames(&mut reader, args, coordinator, written).await;

    watchdog.abort();
    reader.cancel();
    end
}

async fn write_frames(
    reader: &mut HttpMjpegReader,
    args: &Args,
    coordinator: &SharedCoordinator,
    written: &mut u64,
) -> Result<SessionEnd> {
    loop {
        let Some(frame) = reader.read_frame().await? else {
            let cancelled = reader.is_cancelled();
            let timed_out = coordinator.lock().state() == PlaybackState::Timeout;
            return Ok(if cancelled && timed_out {
                SessionEnd::TimedOut
            } else {
                SessionEnd::Finished { cancelled }
            });
        };

        *written += 1;
        let path = args.output.join(format!("frame-{}.jpg", written));
        tokio::fs::write(&path, &frame.data).await?;
        tracing::debug!(path = %path.display(), size = frame.data.len(), "frame written");

        coordinator.lock().frame_displayed(Instant::now());

        if args.max_frames.is_some_and(|max| *written >= max) {
            return Ok(SessionEnd::Limit);
        }
    }
}

/// Report stalls to the coordinator and end the session when it times out
/// or the program is interrupted.
async fn watchdog(
    coordinator: SharedCoordinator,
    session: CancellationToken,
    shutdown: CancellationToken,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    let mut last_frames = coordinator.lock().frames();

    loop {
        tokio::select! {
            _ = session.cancelled() => return,
            _ = shutdown.cancelled() => {
                coordinator.lock().stop(Instant::now());
                session.cancel();
                return;
            }
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        let restart = {
            let mut coordinator = coordinator.lock();
            let frames = coordinator.frames();
            if frames == last_frames {
                coordinator.update(PlaybackState::Waiting, now);
            }
            last_frames = frames;
            coordinator.poll_timeout(now) == Some(PlaybackAction::Restart)
        };

        if restart {
            session.cancel();
            return;
        }
    }
}
