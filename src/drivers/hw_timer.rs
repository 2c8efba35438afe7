//! Timer service: the second execution context.
//!
//! One periodic timer calls [`SharedCore::service_timers`] every
//! `period_ms`, which fires whatever alert timers are due.  The period is
//! the resolution of every flash and cooldown deadline.
//!
//! On ESP-IDF this is an `esp_timer` dispatched from the ESP timer task
//! (not an ISR), so the callback may take the critical section and log.
//! On simulation targets a std thread sleeps for the period instead.

use embedded_hal::digital::OutputPin;
use rand::RngCore;

use crate::error::Error;
use crate::shared::SharedCore;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
static mut SERVICE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: SERVICE_TIMER is written once in `start_timer_service()` from
/// the main task before the timer is started; only the main task reads it.
#[cfg(target_os = "espidf")]
unsafe fn service_timer() -> esp_timer_handle_t {
    unsafe { SERVICE_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn service_cb<P, R>(arg: *mut core::ffi::c_void)
where
    P: OutputPin + Send + 'static,
    R: RngCore + Send + 'static,
{
    // SAFETY: `arg` is the `&'static SharedCore<P, R>` passed to
    // `start_timer_service`, which lives for the rest of the program.
    let shared = unsafe { &*(arg as *const SharedCore<P, R>) };
    shared.service_timers(crate::adapters::time::uptime_ms());
}

/// Start the periodic timer service.
#[cfg(target_os = "espidf")]
pub fn start_timer_service<P, R>(shared: &'static SharedCore<P, R>, period_ms: u32) -> Result<(), Error>
where
    P: OutputPin + Send + 'static,
    R: RngCore + Send + 'static,
{
    let args = esp_timer_create_args_t {
        callback: Some(service_cb::<P, R>),
        arg: core::ptr::from_ref(shared).cast_mut().cast(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: c"alert-timers".as_ptr(),
        skip_unhandled_events: true,
    };
    // SAFETY: SERVICE_TIMER is written here once at boot from the main
    // task, before the timer is started.  `args` outlives the create call.
    unsafe {
        let ret = esp_timer_create(&args, &raw mut SERVICE_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: create failed (rc={ret})");
            return Err(Error::Init("timer service create failed"));
        }
        let ret = esp_timer_start_periodic(service_timer(), u64::from(period_ms.max(1)) * 1_000);
        if ret != ESP_OK {
            log::error!("hw_timer: start failed (rc={ret})");
            return Err(Error::Init("timer service start failed"));
        }
    }
    log::info!("hw_timer: alert timers serviced every {period_ms} ms");
    Ok(())
}

/// Start the timer service thread.
#[cfg(not(target_os = "espidf"))]
pub fn start_timer_service<P, R>(shared: &'static SharedCore<P, R>, period_ms: u32) -> Result<(), Error>
where
    P: OutputPin + Send + 'static,
    R: RngCore + Send + 'static,
{
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crate::adapters::time::uptime_ms;

    sim::RUNNING.store(true, Ordering::Release);
    let period = Duration::from_millis(u64::from(period_ms.max(1)));
    std::thread::Builder::new()
        .name("alert-timers".into())
        .spawn(move || {
            while sim::RUNNING.load(Ordering::Acquire) {
                std::thread::sleep(period);
                shared.service_timers(uptime_ms());
            }
        })
        .map_err(|_| Error::Init("timer service thread spawn failed"))?;
    log::info!("hw_timer(sim): alert timers serviced every {period_ms} ms");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::sync::atomic::AtomicBool;

    pub(super) static RUNNING: AtomicBool = AtomicBool::new(false);
}

/// Stop the timer service.  Pending alert timers stay armed but no longer
/// fire.
#[cfg(target_os = "espidf")]
pub fn stop_timer_service() {
    // SAFETY: service_timer() contract, main task only.  The null check
    // covers a failed or missing start.
    unsafe {
        let handle = service_timer();
        if !handle.is_null() {
            esp_timer_stop(handle);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timer_service() {
    sim::RUNNING.store(false, core::sync::atomic::Ordering::Release);
}
