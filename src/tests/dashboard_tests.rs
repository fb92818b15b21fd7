use chrono::{Local, TimeDelta};
use image::{Rgba, RgbaImage};
use inky_dashboard_lib::compositor::IndexedImage;
use inky_dashboard_lib::config::Config;
use inky_dashboard_lib::dashboard::{Dashboard, DataSource, DataSourceError};
use inky_dashboard_lib::display::{DisplaySink, SinkError};
use inky_dashboard_lib::layout::{TextBounds, Typeface};
use inky_dashboard_lib::palette::{ColorMode, ColorPalette, ACCENT_INDEX, FOREGROUND_INDEX};
use inky_dashboard_lib::render::ViewRenderer;
use inky_dashboard_lib::waste::{SensorState, WasteModule};
use inky_dashboard_lib::{ViewData, PANEL_HEIGHT, PANEL_WIDTH};
use std::cell::Cell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Solid block glyphs, `size / 2` wide.
struct BlockFace;

impl Typeface for BlockFace {
    fn bounds(&self, text: &str, size: u32) -> TextBounds {
        let size = size as i32;
        TextBounds {
            x_min: 0,
            y_min: size / 4,
            x_max: text.chars().count() as i32 * (size / 2),
            y_max: size,
        }
    }

    fn rasterize(
        &self,
        text: &str,
        size: u32,
        origin: (i32, i32),
        plot: &mut dyn FnMut(i32, i32, f32),
    ) {
        let b = self.bounds(text, size);
        for y in b.y_min..b.y_max {
            for x in b.x_min..b.x_max {
                plot(origin.0 + x, origin.1 + y, 1.0);
            }
        }
    }
}

/// Keeps every presented frame.
#[derive(Default)]
struct RecordingSink {
    frames: Vec<IndexedImage>,
}

impl DisplaySink for RecordingSink {
    fn present(&mut self, image: &IndexedImage) -> Result<(), SinkError> {
        assert_eq!((image.width(), image.height()), (PANEL_WIDTH, PANEL_HEIGHT));
        self.frames.push(image.clone());
        Ok(())
    }
}

fn border() -> RgbaImage {
    RgbaImage::from_fn(PANEL_WIDTH, PANEL_HEIGHT, |x, y| {
        if x < 2 || y < 2 || x >= PANEL_WIDTH - 2 || y >= PANEL_HEIGHT - 2 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn renderer() -> ViewRenderer<BlockFace> {
    ViewRenderer::new(BlockFace, border(), ColorMode::Light, ColorPalette::Red, false)
}

fn write_icon(dir: &Path, name: &str, side: u32) -> String {
    let path = dir.join(name);
    RgbaImage::from_pixel(side, side, Rgba([40, 40, 40, 255]))
        .save(&path)
        .unwrap();
    path.to_string_lossy().into_owned()
}

fn waste_config(dir: &Path) -> Config {
    let mut contents = String::from(
        r#"
color_palette = "red"
waste_detailed_days = 3
waste_alert_days = 1

[home_assistant]
url = "http://127.0.0.1:9"
token = "secret"
"#,
    );
    for name in ["paper", "plastic"] {
        contents.push_str(&format!(
            "\n[[home_assistant.sensors]]\nname = '{name}'\nfriendly_name = '{name}'\n\
                entity_id = 'sensor.{name}'\nicon_path_small = '{}'\nicon_path_large = '{}'\n",
            write_icon(dir, &format!("{name}_small.png"), 20),
            write_icon(dir, &format!("{name}_large.png"), 80),
        ));
    }
    Config::from_toml_str(&contents).unwrap()
}

#[test]
fn waste_views_rotate_onto_the_panel() {
    let dir = TempDir::new().unwrap();
    let config = waste_config(dir.path());
    let waste = WasteModule::new(&config).unwrap();
    let today = Local::now().date_naive();
    waste.replace_states(vec![
        SensorState::Available {
            due_date: today + TimeDelta::days(3),
        },
        SensorState::Unavailable,
    ]);

    let mut dashboard = Dashboard::new(
        vec![waste],
        renderer(),
        RecordingSink::default(),
        config.data_interval(),
        config.view_interval(),
    );

    let kinds: Vec<&str> = (0..3)
        .map(|_| dashboard.show_next().unwrap().unwrap().kind())
        .collect();
    assert_eq!(kinds, vec!["dashboard", "detailed_two_line", "dashboard"]);

    let frames = &dashboard.sink().frames;
    assert_eq!(frames.len(), 3);

    // Unavailable sensor raises the border alert and colors its own icon.
    let overview = &frames[0];
    assert_eq!(overview.index_at(0, 0), Some(ACCENT_INDEX));
    assert_eq!(overview.index_at(20, 20), Some(FOREGROUND_INDEX));
    assert_eq!(overview.index_at(130, 20), Some(ACCENT_INDEX));

    // Three days out is shown in detail without any alert.
    let detail = &frames[1];
    assert_eq!(detail.index_at(0, 0), Some(FOREGROUND_INDEX));
    assert_eq!(detail.index_at(60, 60), Some(FOREGROUND_INDEX));

    assert_eq!(frames[2], frames[0]);
}

/// Always fails to refresh but still has views to show.
struct BrokenBackend {
    attempts: Cell<usize>,
}

impl DataSource for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }

    async fn refresh(&self) -> Result<(), DataSourceError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(DataSourceError::InvalidState {
            entity_id: "sensor.broken".into(),
            state: "null".into(),
        })
    }

    fn current_views(&self) -> Vec<ViewData> {
        vec![ViewData::Dashboard {
            elements: vec![],
            is_border_alert: false,
        }]
    }
}

#[tokio::test(start_paused = true)]
async fn failing_data_unit_does_not_stop_the_display() {
    let mut dashboard = Dashboard::new(
        vec![BrokenBackend {
            attempts: Cell::new(0),
        }],
        renderer(),
        RecordingSink::default(),
        Duration::from_secs(10),
        Duration::from_secs(5),
    )
    .with_restart_delay(Duration::from_secs(3));

    let running = AtomicBool::new(true);
    let stop = async {
        tokio::time::sleep(Duration::from_secs(11)).await;
        running.store(false, Ordering::SeqCst);
    };
    tokio::join!(dashboard.run(&running), stop);

    // Restarted at 0, 3, 6 and 9 seconds.
    assert_eq!(dashboard.modules()[0].attempts.get(), 4);
    // Displayed at 0, 5 and 10 seconds.
    assert_eq!(dashboard.sink().frames.len(), 3);
}

#[test]
fn unpolled_waste_module_shows_nothing() {
    let dir = TempDir::new().unwrap();
    let config = waste_config(dir.path());
    let mut dashboard = Dashboard::new(
        vec![WasteModule::new(&config).unwrap()],
        renderer(),
        RecordingSink::default(),
        config.data_interval(),
        config.view_interval(),
    );

    assert_eq!(dashboard.show_next().unwrap(), None);
    assert_eq!(dashboard.show_next().unwrap(), None);
    assert!(dashboard.sink().frames.is_empty());
}
