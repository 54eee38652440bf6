// Typed event handlers, one module per event prefix. All extend the
// Dispatcher and follow the same discipline: resolve the room, take its
// lock, mutate, emit, release.

mod chat;
mod queue;
mod room;
mod screen;
mod video;
mod voice;
