//! nRF52840 firmware entry point.
//!
//! Hardware-only: runs the boot sequence from `firmware::boot`, then hands
//! the HAL core to the application task.

#![no_std]
#![no_main]

use defmt_rtt as _;
use embassy_executor::Spawner;
use panic_probe as _;
use static_cell::StaticCell;

use device_hal::config::{PLATFORM_NAME, WKP_PIN};
use device_hal::{escalate, Fatal, FaultHandler, HalCore, InterruptMode, WakeupInfo};
use firmware::boot;
use firmware::hardware::nvmc::PAGE_SIZE;
use firmware::hardware::{fault_handler, heap, retained, DctFlash, Nrf52Board};
use firmware::FlashConfigStore;

/// Seconds the application sleeps between wakeups when the WKP pin stays
/// quiet.
const APP_SLEEP_SECONDS: u32 = 60;

type AppCore = HalCore<'static, Nrf52Board, FlashConfigStore<'static, DctFlash>>;

static WAKEUP: WakeupInfo = WakeupInfo::new();
static CORE: StaticCell<AppCore> = StaticCell::new();
static DCT_MERGE_BUFFER: StaticCell<[u8; PAGE_SIZE]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!(
        "{=str} HAL v{=str}",
        PLATFORM_NAME,
        device_hal::config::HAL_VERSION
    );

    // Steps 1-3: vector table, system control, heap guard.
    let Some(mut cp) = cortex_m::Peripherals::take() else {
        defmt::panic!("core peripherals already taken");
    };
    boot::hardware::relocate_vector_table(&mut cp.SCB);
    boot::hardware::configure_system(&mut cp.SCB);
    heap::init();

    let Some(p) = nrf52840_pac::Peripherals::take() else {
        defmt::panic!("device peripherals already taken");
    };
    let (board, dct) = match Nrf52Board::new(p, cp.SYST) {
        Ok(parts) => parts,
        Err(fault) => fault_handler().halt(Fatal::Hardware(fault)),
    };
    let Ok(store) = FlashConfigStore::new(dct, DCT_MERGE_BUFFER.init([0; PAGE_SIZE])) else {
        defmt::panic!("dct merge buffer smaller than a flash page");
    };
    let Some(slots) = retained::take() else {
        defmt::panic!("backup slots already taken");
    };

    // Steps 4-5: feature flags, reset reason.
    let core = CORE.init(boot::init_core(board, slots, &WAKEUP, store));

    // Step 6.
    if spawner.spawn(app_task(core)).is_err() {
        defmt::error!("app task already running");
    }
}

/// Sleep on the WKP pin with a timeout, forever.
#[embassy_executor::task]
async fn app_task(core: &'static mut AppCore) {
    let mut fault = fault_handler();
    loop {
        let result =
            core.enter_stop_mode_pin(Some(WKP_PIN.get()), InterruptMode::RisingEdge, APP_SLEEP_SECONDS);
        match escalate(result, &mut fault) {
            Ok(reason) => defmt::info!("woke: {:?} (code {})", reason, reason.code()),
            Err(err) => defmt::warn!("stop mode rejected: {:?}", err),
        }
    }
}
