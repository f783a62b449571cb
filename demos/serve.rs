use std::sync::Arc;

use async_trait::async_trait;
use openrgbd::{
    Color, Controller, ControllerData, ControllerFlags, ControllerRegistry, DeviceBackend,
    DeviceType, ModeData, ModeFlag, OpenRgbResult, Server, ServerConfig, ZoneData, ZoneType,
};

/// Backend that only logs: a stand-in for a real HID/SMBus driver.
struct LoggingBackend;

#[async_trait]
impl DeviceBackend for LoggingBackend {
    async fn update_leds(&mut self, colors: &[Color]) -> OpenRgbResult<()> {
        log::info!("update_leds: {} colors, first {:?}", colors.len(), colors.first());
        Ok(())
    }

    async fn update_zone_leds(&mut self, zone: usize, colors: &[Color]) -> OpenRgbResult<()> {
        log::info!("update_zone_leds: zone {zone}, {} colors", colors.len());
        Ok(())
    }

    async fn update_single_led(&mut self, led: usize, color: Color) -> OpenRgbResult<()> {
        log::info!("update_single_led: led {led} -> {color:?}");
        Ok(())
    }

    async fn update_mode(&mut self, mode: &openrgbd::ModeData) -> OpenRgbResult<()> {
        log::info!("update_mode: {}", mode.name());
        Ok(())
    }

    async fn resize_zone(&mut self, zone: usize, new_size: usize) -> OpenRgbResult<()> {
        log::info!("resize_zone: zone {zone} -> {new_size}");
        Ok(())
    }
}

fn virtual_strip() -> ControllerData {
    let mut data = ControllerData::new("Virtual Strip", DeviceType::LEDStrip)
        .with_vendor("openrgbd")
        .with_description("A virtual 30 LED strip")
        .with_location("virtual")
        .with_flags(ControllerFlags::Local | ControllerFlags::Virtual);
    data.add_mode(
        ModeData::new("Direct", 0, ModeFlag::HasPerLEDColor)
            .with_color_mode(openrgbd::ColorMode::PerLED),
    );
    data.add_zone(ZoneData::new("Strip", ZoneType::Linear, 1, 60, 30));
    data.setup_colors();
    data
}

#[tokio::main]
async fn main() -> OpenRgbResult<()> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("logger init");

    let registry = Arc::new(ControllerRegistry::new());
    registry.register(Controller::new(virtual_strip(), Box::new(LoggingBackend))?);

    let server = Server::new(Arc::clone(&registry), ServerConfig::default());
    server.register_client_info_callback(|event| log::info!("client event: {event:?}"));
    server.register_listening_callback(|event| log::info!("listening event: {event:?}"));
    server.start().await?;
    log::info!(
        "serving {} controller(s) on {}:{}",
        registry.len(),
        server.host(),
        server.port()
    );

    // serve until killed
    std::future::pending::<()>().await;
    Ok(())
}
