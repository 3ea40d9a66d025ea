use std::collections::HashMap;

use menu::{DataHandler, MenuTree, NodeId};

use super::actions::MenuAction;
use crate::pedal::PedalBoard;

pub const POWER_PROMPT: &str = "Power Off?";
pub const POWER_CANCEL: &str = "NO yes";
pub const POWER_CONFIRM: &str = "no YES";

/// Nodes the controller jumps to directly.
#[derive(Debug, Clone, Copy)]
pub struct Landmarks {
    pub setup: NodeId,
    pub global: NodeId,
    pub power: NodeId,
}

/// Build the static menu. Lists are filled by loaders on every visit; the
/// pedal branch mirrors the pedal definitions loaded at startup.
pub fn build(pedals: &PedalBoard) -> (MenuTree<MenuAction>, Landmarks) {
    let mut tree = MenuTree::new("Home");
    let root = tree.root();

    let setup = tree.add_child(root, "Setup");
    list(&mut tree, setup, "Sets", "Setlist", MenuAction::ListSetlists, MenuAction::LoadSetlist);
    list(&mut tree, setup, "Songs", "Song", MenuAction::ListSongs, MenuAction::LoadSong);
    list(&mut tree, setup, "Parts", "Part", MenuAction::ListParts, MenuAction::LoadPart);

    let pedal_root = tree.add_child(setup, "Midi Pedals");
    for (p, name) in pedals.names().enumerate() {
        let pedal_node = tree.add_child(pedal_root, name);
        let Some(pedal) = pedals.get(p) else {
            continue;
        };
        for (c, info) in pedal.commands().into_iter().enumerate() {
            if info.choices.is_empty() {
                let node = tree.add_child(pedal_node, &info.name);
                tree.node_mut(node)
                    .set_action(MenuAction::RunPedalCommand { pedal: p, command: c });
            } else {
                list(
                    &mut tree,
                    pedal_node,
                    &info.name,
                    &info.name,
                    MenuAction::ListPedalChoices { pedal: p, command: c },
                    MenuAction::SendPedalCommand { pedal: p, command: c },
                );
            }
        }
    }

    let global = tree.add_child(root, "Global");
    list(
        &mut tree,
        global,
        "Knob Color",
        "Color",
        MenuAction::ListKnobColors,
        MenuAction::SetKnobColor,
    );
    list(
        &mut tree,
        global,
        "Knob Brightness",
        "Brightness",
        MenuAction::ListBrightness,
        MenuAction::SetBrightness,
    );
    list(&mut tree, global, "Mode", "Mode", MenuAction::ListModes, MenuAction::SetMode);
    let about = tree.add_child(global, "About");
    tree.node_mut(about).set_loader(MenuAction::ListAbout);
    tree.node_mut(about).data_mut().set_prompt("About");

    let power = tree.add_child(root, "Power");
    let data = tree.node_mut(power).data_mut();
    data.set_prompt(POWER_PROMPT);
    data.set_items(vec![POWER_CANCEL.to_string(), POWER_CONFIRM.to_string()]);
    data.set_handler(DataHandler::Dispatch(HashMap::from([
        (POWER_CANCEL.to_string(), MenuAction::GoRoot),
        (POWER_CONFIRM.to_string(), MenuAction::PowerOff),
    ])));

    (tree, Landmarks { setup, global, power })
}

fn list(
    tree: &mut MenuTree<MenuAction>,
    parent: NodeId,
    name: &str,
    prompt: &str,
    loader: MenuAction,
    callback: MenuAction,
) -> NodeId {
    let node = tree.add_child(parent, name);
    let n = tree.node_mut(node);
    n.set_loader(loader);
    n.data_mut().set_prompt(prompt);
    n.data_mut().set_handler(DataHandler::Callback(callback));
    node
}
