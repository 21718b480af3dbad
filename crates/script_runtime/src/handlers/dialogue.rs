// Dialogue handlers - speech and narration routed through the host

use script_types::{Node, NodeType};

use super::arg;
use crate::context::{ExecutionContext, NodeOutput};
use crate::host::HostEvent;
use crate::registry::HandlerRegistry;

pub(super) fn register(registry: &mut HandlerRegistry) {
    registry.register_fn(NodeType::DialogueSay, say);
    registry.register_fn(NodeType::DialogueNarrate, |node, ctx| {
        if let Some(text) = arg(node, "Text") {
            ctx.notify(HostEvent::ShowMessage { text });
        }
        NodeOutput::exec()
    });
    registry.register_fn(NodeType::DialoguePlayVoice, |node, ctx| {
        if let Some(sound_id) = arg(node, "SoundId") {
            ctx.notify(HostEvent::PlaySound { sound_id });
        }
        NodeOutput::exec()
    });
    registry.register_fn(NodeType::DialogueSetGreeting, |node, ctx| {
        let text = node.properties.get_string("Text", "");
        if let Some(npc) = arg(node, "NpcId").and_then(|id| ctx.world.npc_mut(&id)) {
            npc.greeting = text;
        }
        NodeOutput::exec()
    });
}

/// `"<speaker>: <text>"`; the speaker falls back to the NPC's name, then its id
fn say(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(text) = arg(node, "Text") else {
        return NodeOutput::exec();
    };
    let speaker = arg(node, "Speaker").or_else(|| {
        arg(node, "NpcId").map(|id| match ctx.world.npc(&id) {
            Some(npc) if !npc.name.is_empty() => npc.name.clone(),
            _ => id,
        })
    });

    let text = match speaker {
        Some(speaker) => format!("{}: {}", speaker, text),
        None => text,
    };
    ctx.notify(HostEvent::ShowMessage { text });
    NodeOutput::exec()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, world};
    use super::*;

    #[test]
    fn test_say_speaker_resolution() {
        let mut world = world();
        let say = || Node::new("d", NodeType::DialogueSay).prop("Text", "Halt!");

        let (_, host) = run(&say().prop("Speaker", "Captain"), &mut world);
        assert_eq!(host.messages(), vec!["Captain: Halt!"]);

        let (_, host) = run(&say().prop("NpcId", "npc_guard"), &mut world);
        assert_eq!(host.messages(), vec!["Guard: Halt!"]);

        let (_, host) = run(&say().prop("NpcId", "stranger"), &mut world);
        assert_eq!(host.messages(), vec!["stranger: Halt!"]);

        let (_, host) = run(&say(), &mut world);
        assert_eq!(host.messages(), vec!["Halt!"]);
    }

    #[test]
    fn test_say_without_text_is_silent() {
        let mut world = world();
        let (out, host) = run(&Node::new("d", NodeType::DialogueSay).prop("Speaker", "Guard"), &mut world);
        assert_eq!(out.selected_port(), Some("Exec"));
        assert!(host.events().is_empty());
    }

    #[test]
    fn test_narrate_voice_and_greeting() {
        let mut world = world();
        let (_, host) = run(&Node::new("d", NodeType::DialogueNarrate).prop("Text", "Wind howls."), &mut world);
        assert_eq!(host.events(), vec![HostEvent::message("Wind howls.")]);

        let (_, host) = run(&Node::new("d", NodeType::DialoguePlayVoice).prop("SoundId", "vo_01"), &mut world);
        assert_eq!(host.events(), vec![HostEvent::PlaySound { sound_id: "vo_01".into() }]);

        run(
            &Node::new("d", NodeType::DialogueSetGreeting).prop("NpcId", "npc_guard").prop("Text", "Hola"),
            &mut world,
        );
        assert_eq!(world.npc("npc_guard").unwrap().greeting, "Hola");
    }
}
