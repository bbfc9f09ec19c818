// Event bus - Command and Tick channels shared by the transport and its clients

use super::channel::{Channel, Subscription};
use crate::transport::{Tick, TransportCommand};
use serde::Serialize;

/// Either payload the bus can carry, for callers that route generically
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "channel", content = "payload", rename_all = "camelCase")]
pub enum BusMessage {
    Command(TransportCommand),
    Tick(Tick),
}

/// Publication counters for both channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStats {
    pub commands_published: u64,
    pub ticks_published: u64,
    pub command_subscribers: usize,
    pub tick_subscribers: usize,
    pub validation_failures: u64,
    pub handler_panics: u64,
}

pub struct EventBus {
    commands: Channel<TransportCommand>,
    ticks: Channel<Tick>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            commands: Channel::new("command"),
            ticks: Channel::new("tick"),
        }
    }

    pub fn commands(&self) -> &Channel<TransportCommand> {
        &self.commands
    }

    pub fn ticks(&self) -> &Channel<Tick> {
        &self.ticks
    }

    /// Fire-and-forget: the authority applies it on its next pump
    pub fn publish_command(&self, command: TransportCommand) {
        tracing::trace!(command = command.name(), "command published");
        self.commands.publish(&command);
    }

    pub fn publish_tick(&self, tick: &Tick) {
        self.ticks.publish(tick);
    }

    /// Route a message to its channel
    pub fn publish(&self, message: BusMessage) {
        match message {
            BusMessage::Command(command) => self.publish_command(command),
            BusMessage::Tick(tick) => self.publish_tick(&tick),
        }
    }

    pub fn subscribe_commands<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&TransportCommand) + Send + Sync + 'static,
    {
        self.commands.subscribe(handler)
    }

    pub fn subscribe_ticks<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Tick) + Send + Sync + 'static,
    {
        self.ticks.subscribe(handler)
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            commands_published: self.commands.published_count(),
            ticks_published: self.ticks.published_count(),
            command_subscribers: self.commands.subscriber_count(),
            tick_subscribers: self.ticks.subscriber_count(),
            validation_failures: self.commands.validation_failures()
                + self.ticks.validation_failures(),
            handler_panics: self.commands.handler_panics() + self.ticks.handler_panics(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural check for tick payloads, usable as a tick channel validator
pub fn validate_tick(tick: &Tick) -> Result<(), String> {
    if !tick.tempo.is_finite() || tick.tempo <= 0.0 {
        return Err(format!("tick tempo {} is not positive", tick.tempo));
    }
    if tick.position.measure == 0 || tick.position.beat == 0 {
        return Err(format!("tick position {} is not 1-based", tick.position));
    }
    let region = tick.loop_region;
    if region.enabled && region.end_tick <= region.start_tick {
        return Err(format!(
            "loop [{}, {}) is empty",
            region.start_tick, region.end_tick
        ));
    }
    if region.enabled && tick.is_playing && tick.absolute_tick >= region.end_tick {
        return Err(format!(
            "tick {} escaped loop end {}",
            tick.absolute_tick, region.end_tick
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LoopRegion, Position};
    use std::sync::{Arc, Mutex};

    fn tick(absolute_tick: u64) -> Tick {
        Tick {
            position: Position::from_absolute(absolute_tick, 480, &Default::default()),
            absolute_tick,
            tempo: 120.0,
            is_playing: true,
            loop_region: LoopRegion::default(),
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let bus = EventBus::new();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let ticks = Arc::new(Mutex::new(Vec::new()));

        let sink = commands.clone();
        bus.subscribe_commands(move |command| sink.lock().unwrap().push(*command));
        let sink = ticks.clone();
        bus.subscribe_ticks(move |tick| sink.lock().unwrap().push(tick.absolute_tick));

        bus.publish_command(TransportCommand::Play);
        bus.publish(BusMessage::Tick(tick(480)));
        bus.publish(BusMessage::Command(TransportCommand::Seek { tick: 10 }));

        assert_eq!(
            *commands.lock().unwrap(),
            vec![TransportCommand::Play, TransportCommand::Seek { tick: 10 }]
        );
        assert_eq!(*ticks.lock().unwrap(), vec![480]);

        let stats = bus.stats();
        assert_eq!(stats.commands_published, 2);
        assert_eq!(stats.ticks_published, 1);
        assert_eq!(stats.command_subscribers, 1);
        assert_eq!(stats.tick_subscribers, 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish_tick(&tick(0));
        assert_eq!(bus.stats().ticks_published, 1);
    }

    #[test]
    fn test_tick_validator() {
        let bus = EventBus::new();
        bus.ticks().set_validator(validate_tick);

        bus.publish_tick(&tick(100));
        assert_eq!(bus.stats().validation_failures, 0);

        let mut escaped = tick(2000);
        escaped.loop_region = LoopRegion {
            enabled: true,
            start_tick: 0,
            end_tick: 960,
        };
        bus.publish_tick(&escaped);

        let mut bad_tempo = tick(0);
        bad_tempo.tempo = 0.0;
        bus.publish_tick(&bad_tempo);

        assert_eq!(bus.stats().validation_failures, 2);
    }

    #[test]
    fn test_bus_message_json() {
        let json = serde_json::to_value(BusMessage::Command(TransportCommand::Pause)).unwrap();
        assert_eq!(json["channel"], "command");
        assert_eq!(json["payload"]["type"], "pause");
    }
}
