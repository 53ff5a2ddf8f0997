//! The standard host-object catalog.
//!
//! One entry per host type the scripting runtime exposes. Field result
//! types are declared only where the runtime guarantees the concrete type;
//! optional-valued fields stay untyped and resolve, where possible, through
//! the parent-constrained bare-name mechanism instead.

use crate::{ty, TypeSpec};

pub(crate) fn catalog() -> Vec<TypeSpec> {
    let mut specs = Vec::new();

    // ── Chat context ─────────────────────────────────────────────
    specs.push(
        ty("ctx")
            .field("guild", "")
            .field("channel", "")
            .field("author", "")
            .field("prefix", "")
            .field("alias", "")
            .field("message_id", "")
            .build(),
    );
    specs.push(
        ty("guild")
            .parents(&["ctx"])
            .field_of("name", "str", "Guild (server) name.")
            .field("id", "Guild (server) id.")
            .method("servsettings", "servsettings()", "")
            .build(),
    );
    specs.push(
        ty("channel")
            .parents(&["ctx"])
            .field_of("name", "str", "Channel name.")
            .field("id", "Channel id.")
            .field("topic", "Channel topic, if set.")
            .field("category", "Parent category for the channel.")
            .field("parent", "Parent channel, if present.")
            .build(),
    );
    specs.push(
        ty("category")
            .parents(&["channel"])
            .field_of("name", "str", "Category name.")
            .field("id", "Category id.")
            .build(),
    );
    specs.push(
        ty("author")
            .parents(&["ctx"])
            .field_of("name", "str", "User name for the invoking author.")
            .field("id", "User id for the invoking author.")
            .field_of("discriminator", "str", "User discriminator/tag.")
            .field_of("display_name", "str", "Display name for the author.")
            .field_list("roles", "role", "Roles held by the author.")
            .method("get_roles", "get_roles()", "")
            .build(),
    );
    specs.push(
        ty("role")
            .parents(&["author"])
            .field_of("name", "str", "Role name.")
            .field("id", "Role id.")
            .build(),
    );

    // ── Dice ─────────────────────────────────────────────────────
    specs.push(
        ty("SimpleRollResult")
            .field_of("dice", "str", "Markdown representation of the dice that were rolled.")
            .field_of("total", "int", "Numeric total of the resolved roll.")
            .field_of("full", "str", "Rendered roll result string.")
            .field("result", "Underlying roll result object.")
            .field("raw", "Original dice expression for the roll.")
            .method("consolidated", "consolidated()", "")
            .build(),
    );

    // ── Stat block pieces ────────────────────────────────────────
    specs.push(
        ty("stats")
            .field_of("prof_bonus", "int", "Proficiency bonus for the character.")
            .field_of("strength", "int", "Strength ability score.")
            .field_of("dexterity", "int", "Dexterity ability score.")
            .field_of("constitution", "int", "Constitution ability score.")
            .field_of("intelligence", "int", "Intelligence ability score.")
            .field_of("wisdom", "int", "Wisdom ability score.")
            .field_of("charisma", "int", "Charisma ability score.")
            .method("get_mod", "get_mod(stat)", "")
            .method("get", "get(stat)", "")
            .build(),
    );
    specs.push(
        ty("levels")
            .parents(&["character"])
            .field("total_level", "Sum of all class levels.")
            .method("get", "get(cls_name, default=0)", "")
            .safe(&["get"])
            .build(),
    );

    let attack = ty("attack")
        .parents(&["attacks", "actions"])
        .field_of("name", "str", "Attack name.")
        .field("verb", "Attack verb or action phrase.")
        .field("proper", "Whether the attack name is treated as proper.")
        .field("activation_type", "Activation type identifier for this attack.")
        .field("raw", "Raw attack payload from the statblock.");
    specs.push(attack.build());
    specs.push(ty("attacks").parents(&["character"]).element("attack").build());

    let skill = ty("skill")
        .parents(&["skills"])
        .field_of("value", "int", "Total modifier for the skill.")
        .field("prof", "Proficiency value applied to the skill.")
        .field_of("bonus", "int", "Base bonus before rolling.")
        .field("adv", "Advantage state for the skill roll (True/False/None).")
        .method(
            "d20",
            "d20(base_adv=None, reroll=None, min_val=None, mod_override=None)",
            "",
        );
    specs.push(skill.alias("AliasSkill", &["skills"]));
    specs.push(skill.build());

    let skills = ty("skills")
        .parents(&["character"])
        .element("skill")
        .field_of("acrobatics", "skill", "Acrobatics skill bonus.")
        .field_of("animalHandling", "skill", "Animal Handling skill bonus.")
        .field_of("arcana", "skill", "Arcana skill bonus.")
        .field_of("athletics", "skill", "Athletics skill bonus.")
        .field_of("deception", "skill", "Deception skill bonus.")
        .field_of("history", "skill", "History skill bonus.")
        .field_of("initiative", "skill", "Initiative modifier.")
        .field_of("insight", "skill", "Insight skill bonus.")
        .field_of("intimidation", "skill", "Intimidation skill bonus.")
        .field_of("investigation", "skill", "Investigation skill bonus.")
        .field_of("medicine", "skill", "Medicine skill bonus.")
        .field_of("nature", "skill", "Nature skill bonus.")
        .field_of("perception", "skill", "Perception skill bonus.")
        .field_of("performance", "skill", "Performance skill bonus.")
        .field_of("persuasion", "skill", "Persuasion skill bonus.")
        .field_of("religion", "skill", "Religion skill bonus.")
        .field_of("sleightOfHand", "skill", "Sleight of Hand skill bonus.")
        .field_of("stealth", "skill", "Stealth skill bonus.")
        .field_of("survival", "skill", "Survival skill bonus.")
        .field_of("strength", "skill", "Strength ability score for this skill block.")
        .field_of("dexterity", "skill", "Dexterity ability score for this skill block.")
        .field_of("constitution", "skill", "Constitution ability score for this skill block.")
        .field_of("intelligence", "skill", "Intelligence ability score for this skill block.")
        .field_of("wisdom", "skill", "Wisdom ability score for this skill block.")
        .field_of("charisma", "skill", "Charisma ability score for this skill block.");
    specs.push(skills.alias("AliasSkills", &["character"]));
    specs.push(skills.build());

    specs.push(
        ty("saves")
            .parents(&["character"])
            .method("get", "get(base_stat)", "")
            .safe(&["get"])
            .build(),
    );
    specs.push(
        ty("resistances")
            .parents(&["character"])
            .field("resist", "Damage types resisted.")
            .field("vuln", "Damage types this target is vulnerable to.")
            .field("immune", "Damage types the target is immune to.")
            .field("neutral", "Damage types with no modifiers.")
            .method("is_resistant", "is_resistant(damage_type)", "")
            .method("is_immune", "is_immune(damage_type)", "")
            .method("is_vulnerable", "is_vulnerable(damage_type)", "")
            .method("is_neutral", "is_neutral(damage_type)", "")
            .safe(&["is_resistant", "is_immune", "is_vulnerable", "is_neutral"])
            .build(),
    );
    specs.push(
        ty("coinpurse")
            .parents(&["character"])
            .field("pp", "Platinum pieces carried.")
            .field("gp", "Gold pieces carried.")
            .field("ep", "Electrum pieces carried.")
            .field("sp", "Silver pieces carried.")
            .field("cp", "Copper pieces carried.")
            .field("total", "Total value of all coins.")
            .method("coin_str", "coin_str(cointype)", "")
            .method("compact_str", "compact_str()", "")
            .method(
                "modify_coins",
                "modify_coins(pp=0, gp=0, ep=0, sp=0, cp=0, autoconvert=True)",
                "",
            )
            .method("set_coins", "set_coins(pp, gp, ep, sp, cp)", "")
            .method("autoconvert", "autoconvert()", "")
            .method("get_coins", "get_coins()", "")
            .safe(&["get_coins"])
            .build(),
    );

    let counter = ty("custom_counter")
        .parents(&["character"])
        .field_of("name", "str", "Internal name of the counter.")
        .field("title", "Display title for the counter.")
        .field("desc", "Description text for the counter.")
        .field_of("value", "int", "Current counter value.")
        .field_of("max", "int", "Maximum value for the counter.")
        .field_of("min", "int", "Minimum value for the counter.")
        .field("reset_on", "Reset cadence for the counter (e.g., long/short rest).")
        .field("display_type", "Display style for the counter.")
        .field("reset_to", "Value to reset the counter to.")
        .field("reset_by", "Increment applied when the counter resets.")
        .method("mod", "mod(value, strict=False)", "")
        .method("set", "set(new_value, strict=False)", "")
        .method("reset", "reset()", "")
        .method("full_str", "full_str(include_name=False)", "");
    specs.push(counter.alias("consumable", &["character"]));
    specs.push(counter.build());

    specs.push(
        ty("death_saves")
            .parents(&["character"])
            .field_of("successes", "int", "Number of successful death saves.")
            .field_of("fails", "int", "Number of failed death saves.")
            .method("succeed", "succeed(num=1)", "")
            .method("fail", "fail(num=1)", "")
            .method("is_stable", "is_stable()", "")
            .method("is_dead", "is_dead()", "")
            .method("reset", "reset()", "")
            .safe(&["is_stable", "is_dead"])
            .build(),
    );
    specs.push(
        ty("action")
            .parents(&["actions", "character"])
            .field_of("name", "str", "Action name.")
            .field("activation_type", "Activation type identifier for this action.")
            .field("activation_type_name", "Readable activation type name.")
            .field_of("description", "str", "Full description of the action.")
            .field_of("snippet", "str", "Short snippet describing the action.")
            .build(),
    );

    specs.push(
        ty("spell")
            .parents(&["spellbook"])
            .field_of("name", "str", "Spell name.")
            .field("dc", "Save DC for this spell.")
            .field("sab", "Spell attack bonus for this spell.")
            .field("mod", "Spellcasting modifier applied to the spell.")
            .field("prepared", "Whether the spell is prepared/known.")
            .build(),
    );
    specs.push(
        ty("spellbook")
            .parents(&["character"])
            .field_of("dc", "int", "Save DC for spells in this spellbook.")
            .field_of("sab", "int", "Spell attack bonus for this spellbook.")
            .field_of("caster_level", "int", "Caster level used for the spellbook.")
            .field_of("spell_mod", "int", "Spellcasting ability modifier.")
            .field_list("spells", "spell", "Spells grouped by level.")
            .field("pact_slot_level", "Level of pact slots, if any.")
            .field("num_pact_slots", "Number of pact slots available.")
            .field("max_pact_slots", "Maximum pact slots available.")
            .method("find", "find(spell_name)", "")
            .method("slots_str", "slots_str(level)", "")
            .method("get_max_slots", "get_max_slots(level)", "")
            .method("get_slots", "get_slots(level)", "")
            .method("set_slots", "set_slots(level, value, pact=True)", "")
            .method("use_slot", "use_slot(level)", "")
            .method("reset_slots", "reset_slots()", "")
            .method("reset_pact_slots", "reset_pact_slots()", "")
            .method("remaining_casts_of", "remaining_casts_of(spell, level)", "")
            .method("cast", "cast(spell, level)", "")
            .method("can_cast", "can_cast(spell, level)", "")
            .safe(&["find", "get_slots", "get_max_slots", "remaining_casts_of", "can_cast"])
            .build(),
    );

    // ── Character sheet ──────────────────────────────────────────
    specs.push(
        ty("character")
            .field_of("name", "str", "")
            .field_of("stats", "stats", "")
            .field_of("levels", "levels", "")
            .field_of("attacks", "attacks", "")
            .field_of("skills", "skills", "")
            .field_of("saves", "saves", "")
            .field_of("resistances", "resistances", "")
            .field("ac", "")
            .field("max_hp", "")
            .field("hp", "")
            .field_of("temp_hp", "int", "")
            .field_of("spellbook", "spellbook", "")
            .field("creature_type", "")
            .field_list("actions", "action", "")
            .field_of("coinpurse", "coinpurse", "")
            .field("csettings", "")
            .field("race", "")
            .field("background", "")
            .field("owner", "")
            .field("upstream", "")
            .field("sheet_type", "")
            .field("cvars", "")
            .field_list("consumables", "custom_counter", "")
            .field_of("death_saves", "death_saves", "")
            .field("description", "")
            .field("image", "")
            .method("set_hp", "set_hp(new_hp)", "")
            .method("modify_hp", "modify_hp(amount, ignore_temp=False, overflow=True)", "")
            .method("hp_str", "hp_str()", "")
            .method("reset_hp", "reset_hp()", "")
            .method("set_temp_hp", "set_temp_hp(new_temp)", "")
            .method("cc", "cc(name)", "")
            .method("get_cc", "get_cc(name)", "")
            .method("get_cc_max", "get_cc_max(name)", "")
            .method("get_cc_min", "get_cc_min(name)", "")
            .method("set_cc", "set_cc(name, value=None, maximum=None, minimum=None)", "")
            .method("mod_cc", "mod_cc(name, val, strict=False)", "")
            .method("delete_cc", "delete_cc(name)", "")
            .method(
                "create_cc_nx",
                "create_cc_nx(name, minVal=None, maxVal=None, reset=None, dispType=None)",
                "",
            )
            .method(
                "create_cc",
                "create_cc(name, minVal=None, maxVal=None, reset=None, dispType=None)",
                "",
            )
            .method(
                "edit_cc",
                "edit_cc(name, minVal=None, maxVal=None, reset=None, dispType=None)",
                "",
            )
            .method("cc_exists", "cc_exists(name)", "")
            .method("cc_str", "cc_str(name)", "")
            .method("get_cvar", "get_cvar(name, default=None)", "")
            .method("set_cvar", "set_cvar(name, val)", "")
            .method("set_cvar_nx", "set_cvar_nx(name, val)", "")
            .method("delete_cvar", "delete_cvar(name)", "")
            .safe(&["get_cvar", "get_cc"])
            .build(),
    );

    // ── Combat ───────────────────────────────────────────────────
    let effect = ty("effect")
        .parents(&["combatant", "SimpleCombatant"])
        .field_of("name", "str", "Effect name.")
        .field("duration", "Configured duration for the effect.")
        .field("remaining", "Remaining duration for the effect.")
        .field("effect", "Raw effect payload.")
        .field("attacks", "Attack data attached to the effect, if any.")
        .field("buttons", "Buttons provided by the effect.")
        .field("conc", "Whether the effect requires concentration.")
        .field("desc", "Effect description text.")
        .field("ticks_on_end", "Whether the effect ticks when it ends.")
        .field("combatant_name", "Name of the owning combatant.")
        .field("parent", "Parent effect, if nested.")
        .field_list("children", "effect", "Child effects nested under this effect.")
        .method("set_parent", "set_parent(parent)", "");
    specs.push(effect.alias("SimpleEffect", &["combatant", "SimpleCombatant"]));
    specs.push(effect.build());

    let combatant = ty("combatant")
        .parents(&["combat", "SimpleCombat", "group", "SimpleGroup"])
        .field_of("name", "str", "")
        .field_of("stats", "stats", "")
        .field_of("levels", "levels", "")
        .field_of("attacks", "attacks", "")
        .field_of("skills", "skills", "")
        .field_of("saves", "saves", "")
        .field_of("resistances", "resistances", "")
        .field("ac", "")
        .field("max_hp", "")
        .field("hp", "")
        .field_of("temp_hp", "int", "")
        .field_of("spellbook", "spellbook", "")
        .field("creature_type", "")
        .field_list("effects", "effect", "Active effects on this combatant.")
        .field_of("init", "int", "Initiative roll for this combatant.")
        .field_of("initmod", "int", "Initiative modifier.")
        .field_of("type", "str", "")
        .field("note", "")
        .field("controller", "")
        .field("group", "")
        .field("race", "")
        .field("monster_name", "")
        .field("is_hidden", "")
        .method("set_hp", "set_hp(new_hp)", "")
        .method("modify_hp", "modify_hp(amount, ignore_temp=False, overflow=True)", "")
        .method("hp_str", "hp_str()", "")
        .method("reset_hp", "reset_hp()", "")
        .method("set_temp_hp", "set_temp_hp(new_temp)", "")
        .method("save", "save(ability, adv=None)", "")
        .method(
            "damage",
            "damage(dice_str, crit=False, d=None, c=None, critdice=0, overheal=False)",
            "",
        )
        .method("set_ac", "set_ac(ac)", "")
        .method("set_maxhp", "set_maxhp(maxhp)", "")
        .method("set_init", "set_init(init)", "")
        .method("set_name", "set_name(name)", "")
        .method("set_group", "set_group(group)", "")
        .method("set_note", "set_note(note)", "")
        .method("get_effect", "get_effect(name, strict=False)", "")
        .method("add_effect", "add_effect(name, duration=None, **kwargs)", "")
        .method("remove_effect", "remove_effect(name, strict=False)", "")
        .safe(&["get_effect"]);
    specs.push(combatant.alias(
        "SimpleCombatant",
        &["combat", "SimpleCombat", "group", "SimpleGroup"],
    ));
    specs.push(combatant.build());

    let group = ty("group")
        .parents(&["combat", "SimpleCombat"])
        .field_list("combatants", "combatant", "Combatants in this group.")
        .field_of("type", "str", "")
        .field_of("init", "int", "Initiative for the group.")
        .field_of("name", "str", "")
        .field("id", "")
        .method("get_combatant", "get_combatant(name, strict=None)", "")
        .method("set_init", "set_init(init)", "")
        .safe(&["get_combatant"]);
    specs.push(group.alias("SimpleGroup", &["combat", "SimpleCombat"]));
    specs.push(group.build());

    let combat = ty("combat")
        .field_list("combatants", "combatant", "All combatants in the encounter.")
        .field_list("groups", "group", "Combatant groups in the encounter.")
        .field("me", "The combatant matching the active character, if any.")
        .field("current", "Combatant or group whose turn it is.")
        .field("name", "")
        .field_of("round_num", "int", "Current round number.")
        .field_of("turn_num", "int", "Current turn number.")
        .field("metadata", "")
        .method("get_combatant", "get_combatant(name, strict=None)", "")
        .method("get_group", "get_group(name, strict=None)", "")
        .method("set_metadata", "set_metadata(k, v)", "")
        .method("get_metadata", "get_metadata(k, default=None)", "")
        .method("delete_metadata", "delete_metadata(k)", "")
        .method("set_round", "set_round(round_num)", "")
        .method("end_round", "end_round()", "")
        .safe(&["get_combatant", "get_group", "get_metadata"]);
    specs.push(combat.alias("SimpleCombat", &[]));
    specs.push(combat.build());

    // ── Script value builtins ────────────────────────────────────
    specs.push(
        ty("list")
            .method("append", "append(value)", "")
            .method("extend", "extend(iterable)", "")
            .method("insert", "insert(index, value)", "")
            .method("remove", "remove(value)", "")
            .method("pop", "pop(index=-1)", "")
            .method("clear", "clear()", "")
            .method("index", "index(value, start=0, stop=None)", "")
            .method("count", "count(value)", "")
            .method("sort", "sort(key=None, reverse=False)", "")
            .method("reverse", "reverse()", "")
            .method("copy", "copy()", "")
            .build(),
    );
    specs.push(
        ty("dict")
            .method("get", "get(key, default=None)", "")
            .method("keys", "keys()", "")
            .method("values", "values()", "")
            .method("items", "items()", "")
            .method("pop", "pop(key, default=None)", "")
            .method("popitem", "popitem()", "")
            .method("update", "update(*args, **kwargs)", "")
            .method("setdefault", "setdefault(key, default=None)", "")
            .method("clear", "clear()", "")
            .method("copy", "copy()", "")
            .safe(&["get"])
            .build(),
    );
    specs.push(
        ty("str")
            .element("str")
            .method("lower", "lower()", "")
            .method("upper", "upper()", "")
            .method("title", "title()", "")
            .method("split", "split(sep=None, maxsplit=-1)", "")
            .method("join", "join(iterable)", "")
            .method("replace", "replace(old, new, count=-1)", "")
            .method("strip", "strip(chars=None)", "")
            .method("startswith", "startswith(prefix, start=0, end=None)", "")
            .method("endswith", "endswith(suffix, start=0, end=None)", "")
            .method("format", "format(*args, **kwargs)", "")
            .build(),
    );
    specs.push(ty("int").build());

    specs.push(
        ty("ParsedArguments")
            .method(
                "get",
                "get(arg, default=[], type_=str, ephem=False)",
                "returns all values for the arg cast to the given type.",
            )
            .method(
                "last",
                "last(arg, default=None, type_=str, ephem=False)",
                "returns the most recent value cast to the given type.",
            )
            .method(
                "adv",
                "adv(eadv=False, boolwise=False, ephemeral=False, custom=None)",
                "returns -1/0/1/2 indicator for dis/normal/adv/elven accuracy.",
            )
            .method(
                "join",
                "join(arg, connector, default=None, ephem=False)",
                "joins all argument values with a separator into a string.",
            )
            .method("ignore", "ignore(arg)", "removes argument values so later reads skip them.")
            .method("update", "update(new)", "replaces values for an argument.")
            .method("update_nx", "update_nx(new)", "sets values only if the argument is missing.")
            .method(
                "set_context",
                "set_context(context)",
                "associates a context bucket for nested parsing.",
            )
            .method(
                "add_context",
                "add_context(key, context)",
                "appends a context bucket for nested parsing.",
            )
            .build(),
    );

    specs
}
