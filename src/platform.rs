use crate::audio::AudioSystem;
use crate::graphics::Graphics;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, OnceLock};
use std::task::{Context as TaskContext, Poll, RawWaker, RawWakerVTable, Waker};

static GLOBAL_GRAPHICS: OnceLock<Mutex<Graphics>> = OnceLock::new();
static GLOBAL_AUDIO: OnceLock<AudioSystem> = OnceLock::new();

pub(crate) fn set_global_graphics(graphics: Graphics) -> Result<(), Graphics> {
    GLOBAL_GRAPHICS
        .set(Mutex::new(graphics))
        .map_err(|m| m.into_inner().unwrap_or_else(|e| e.into_inner()))
}

pub(crate) fn with_graphics<R>(f: impl FnOnce(&mut Graphics) -> R) -> R {
    let mutex = GLOBAL_GRAPHICS
        .get()
        .expect("global Graphics not initialized");
    let mut g = mutex.lock().expect("Graphics mutex poisoned");
    f(&mut g)
}

/// The audio system is created on first use. Construction never touches an
/// output device; `AudioSystem::start_output` does, once the window is up.
pub(crate) fn with_audio<R>(f: impl FnOnce(&AudioSystem) -> R) -> R {
    f(GLOBAL_AUDIO.get_or_init(AudioSystem::new))
}

pub(crate) fn create_wgpu_instance() -> wgpu::Instance {
    wgpu::Instance::default()
}

pub(crate) fn block_on<F: Future>(mut future: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        fn wake(_: *const ()) {}
        fn wake_by_ref(_: *const ()) {}
        fn drop(_: *const ()) {}

        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = TaskContext::from_waker(&waker);
    // SAFETY: the future lives on this stack frame and is never moved after
    // being pinned here.
    let mut future = unsafe { Pin::new_unchecked(&mut future) };
    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(v) => return v,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}
